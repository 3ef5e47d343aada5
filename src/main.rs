//! Native demo: load a chain description from disk, pose it and report link
//! poses and proximity as JSON.
//!
//! ```text
//! kinprox-demo robot.urdf --joint shoulder=0.5 --joint elbow=-1.2
//! kinprox-demo arm.json --other obstacle.json --config engine.json
//! ```

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::{Path, PathBuf};

    use anyhow::{bail, Context, Result};
    use clap::Parser;
    use kinprox::{Bridge, ChainHandle, EngineConfig};
    use log::info;
    use serde_json::json;

    #[derive(Debug, Parser)]
    #[command(name = "kinprox-demo", about = "Forward kinematics and proximity for a chain file")]
    struct Args {
        /// Chain description (JSON or URDF).
        chain: PathBuf,

        /// Joint value as `name=value`; unspecified joints are zero.
        #[arg(short, long = "joint", value_parser = parse_joint)]
        joints: Vec<(String, f64)>,

        /// Second chain to check against the first, left at its zero pose.
        #[arg(long)]
        other: Option<PathBuf>,

        /// Engine configuration JSON.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only report whether anything collides.
        #[arg(long)]
        collision_only: bool,
    }

    fn parse_joint(s: &str) -> std::result::Result<(String, f64), String> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|e| format!("bad value for '{name}': {e}"))?;
        Ok((name.trim().to_string(), value))
    }

    fn inject(bridge: &Bridge, path: &Path) -> Result<String> {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let key = path.to_string_lossy().into_owned();
        bridge.inject_file(&key, bytes);
        Ok(key)
    }

    fn apply_joints(
        bridge: &mut Bridge,
        handle: ChainHandle,
        joints: &[(String, f64)],
    ) -> Result<()> {
        let dofs = bridge.dof_names(handle)?;
        for (name, _) in joints {
            if !dofs.contains(name) {
                bail!("chain has no movable joint '{name}' (joints: {})", dofs.join(", "));
            }
        }
        let values: Vec<f64> = dofs
            .iter()
            .map(|dof| {
                joints
                    .iter()
                    .rev()
                    .find(|(name, _)| name == dof)
                    .map_or(0.0, |(_, v)| *v)
            })
            .collect();
        bridge.set_joint_positions(handle, &values)?;
        Ok(())
    }

    fn link_poses(bridge: &Bridge, handle: ChainHandle) -> Result<serde_json::Value> {
        let names = bridge.link_names(handle)?;
        let poses = bridge.poses(handle)?;
        let entries: Vec<_> = names
            .iter()
            .zip(poses.iter())
            .map(|(name, pose)| {
                json!({
                    "link": name,
                    "position": pose.position.to_array(),
                    "rotation": pose.rotation.to_array(),
                })
            })
            .collect();
        Ok(json!(entries))
    }

    pub fn run() -> Result<()> {
        env_logger::init();
        let args = Args::parse();

        let config = match &args.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                EngineConfig::from_json(&text)?
            }
            None => EngineConfig::default(),
        };
        let mut bridge = Bridge::new(config);

        let key = inject(&bridge, &args.chain)?;
        let handle = bridge.load_chain(&key)?;
        apply_joints(&mut bridge, handle, &args.joints)?;

        let other = match &args.other {
            Some(path) => {
                let key = inject(&bridge, path)?;
                let other = bridge.load_chain(&key)?;
                apply_joints(&mut bridge, other, &[])?;
                Some(other)
            }
            None => None,
        };
        info!("loaded {} chain(s)", bridge.handles().len());

        if args.collision_only {
            let colliding = bridge.in_collision(&bridge.handles())?;
            println!("{}", json!({ "colliding": colliding }));
            return Ok(());
        }

        let mut proximity = bridge.proximity(handle, None)?;
        if let Some(other) = other {
            proximity.extend(bridge.proximity(handle, Some(other))?);
        }

        let report = json!({
            "chain": bridge.chain(handle)?.name(),
            "poses": link_poses(&bridge, handle)?,
            "proximity": proximity,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }

}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    cli::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {}
