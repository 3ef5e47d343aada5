//! URDF subset reader.
//!
//! Understands `<robot>`, `<link>` with `<collision>` geometry (sphere, box,
//! cylinder, capsule) and `<joint>` of type revolute, continuous, prismatic or
//! fixed. Visual, inertial, material and vendor elements are skipped.

use glam::DVec3;
use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;

use super::chain::{ChainBuilder, JointSpec, JointSpecKind, KinematicChain};
use super::link::{Collider, Link};
use crate::error::{Error, Result};
use crate::math::Transform;
use crate::proximity::Shape;

/// Parse and validate a URDF document.
pub fn parse_urdf(xml: &str) -> Result<KinematicChain> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    read_document(&mut reader)?.build()
}

fn xml_error(e: impl std::fmt::Display) -> Error {
    Error::parse(format!("malformed URDF: {e}"))
}

fn read_document<R: BufRead>(reader: &mut Reader<R>) -> Result<ChainBuilder> {
    let mut buf = Vec::new();
    let mut robot: Option<ChainBuilder> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"robot" => {
                robot = Some(read_robot(reader, e)?);
            }
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"robot" => {
                return Err(Error::structural("robot has no links"));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(e)),
        }
        buf.clear();
    }

    robot.ok_or_else(|| Error::parse("URDF document has no <robot> element"))
}

fn read_robot<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<ChainBuilder> {
    let name = attribute_opt(start, "name").unwrap_or_else(|| "robot".to_string());
    let mut robot = ChainBuilder::new(name);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let elem = e.name().as_ref().to_vec();
                match elem.as_slice() {
                    b"link" => robot = robot.add_link(read_link(reader, e)?),
                    b"joint" => robot = robot.add_joint(read_joint(reader, e)?),
                    _ => {
                        debug!("skipping <{}>", String::from_utf8_lossy(&elem));
                        skip_element(reader, &elem)?;
                    }
                }
            }
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"link" => {
                robot = robot.add_link(Link::new(attribute(e, "name")?));
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"robot" => break,
            Ok(Event::Eof) => return Err(xml_error("unexpected end of document in <robot>")),
            Ok(_) => {}
            Err(e) => return Err(xml_error(e)),
        }
        buf.clear();
    }

    Ok(robot)
}

fn read_link<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Link> {
    let mut link = Link::new(attribute(start, "name")?);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let elem = e.name().as_ref().to_vec();
                match elem.as_slice() {
                    b"collision" => {
                        let collider = read_collision(reader, &link.name)?;
                        link = link.with_collider(collider);
                    }
                    _ => skip_element(reader, &elem)?,
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"link" => break,
            Ok(Event::Eof) => return Err(xml_error("unexpected end of document in <link>")),
            Ok(_) => {}
            Err(e) => return Err(xml_error(e)),
        }
        buf.clear();
    }

    Ok(link)
}

fn read_collision<R: BufRead>(reader: &mut Reader<R>, link: &str) -> Result<Collider> {
    let mut origin = Transform::IDENTITY;
    let mut shape: Option<Shape> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"origin" => {
                origin = read_origin(e)?;
            }
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"geometry" => {
                shape = Some(read_geometry(reader, link)?);
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"collision" => break,
            Ok(Event::Eof) => return Err(xml_error("unexpected end of document in <collision>")),
            Ok(_) => {}
            Err(e) => return Err(xml_error(e)),
        }
        buf.clear();
    }

    let shape = shape
        .ok_or_else(|| Error::parse(format!("collision of link '{link}' has no geometry")))?;
    Ok(Collider::new(shape).with_origin(origin))
}

fn read_geometry<R: BufRead>(reader: &mut Reader<R>, link: &str) -> Result<Shape> {
    let mut buf = Vec::new();
    let mut shape: Option<Shape> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"sphere" => {
                    shape = Some(Shape::sphere(float_attribute(e, "radius")?));
                }
                b"box" => {
                    let size = parse_vector3(&attribute(e, "size")?)?;
                    shape = Some(Shape::cuboid(size * 0.5));
                }
                b"cylinder" => {
                    shape = Some(Shape::cylinder(
                        float_attribute(e, "radius")?,
                        float_attribute(e, "length")? * 0.5,
                    ));
                }
                b"capsule" => {
                    shape = Some(Shape::capsule(
                        float_attribute(e, "radius")?,
                        float_attribute(e, "length")? * 0.5,
                    ));
                }
                b"mesh" => {
                    let file = attribute_opt(e, "filename").unwrap_or_default();
                    return Err(Error::incompatible(format!(
                        "link '{link}': mesh geometry '{file}' is not supported"
                    )));
                }
                other => {
                    return Err(Error::incompatible(format!(
                        "link '{link}': unsupported geometry <{}>",
                        String::from_utf8_lossy(other)
                    )));
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"geometry" => break,
            Ok(Event::Eof) => return Err(xml_error("unexpected end of document in <geometry>")),
            Ok(_) => {}
            Err(e) => return Err(xml_error(e)),
        }
        buf.clear();
    }

    shape.ok_or_else(|| Error::parse(format!("empty <geometry> in link '{link}'")))
}

fn read_joint<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<JointSpec> {
    let name = attribute(start, "name")?;
    let kind = match attribute(start, "type")?.as_str() {
        "revolute" => JointSpecKind::Revolute,
        "continuous" => JointSpecKind::Continuous,
        "prismatic" => JointSpecKind::Prismatic,
        "fixed" => JointSpecKind::Fixed,
        unsupported @ ("floating" | "planar") => {
            return Err(Error::parse(format!(
                "joint '{name}': {unsupported} joints are not supported"
            )));
        }
        unknown => {
            return Err(Error::parse(format!(
                "joint '{name}': unknown joint type '{unknown}'"
            )));
        }
    };

    let mut parent: Option<String> = None;
    let mut child: Option<String> = None;
    let mut origin = Transform::IDENTITY;
    let mut axis = DVec3::X;
    let mut limits: Option<(f64, f64)> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"parent" => parent = Some(attribute(e, "link")?),
                b"child" => child = Some(attribute(e, "link")?),
                b"origin" => origin = read_origin(e)?,
                b"axis" => {
                    if let Some(xyz) = attribute_opt(e, "xyz") {
                        axis = parse_vector3(&xyz)?;
                    }
                }
                b"limit" => {
                    limits = Some((
                        float_attribute_or(e, "lower", 0.0)?,
                        float_attribute_or(e, "upper", 0.0)?,
                    ));
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"joint" => break,
            Ok(Event::Eof) => return Err(xml_error("unexpected end of document in <joint>")),
            Ok(_) => {}
            Err(e) => return Err(xml_error(e)),
        }
        buf.clear();
    }

    let parent = parent.ok_or_else(|| Error::parse(format!("joint '{name}' has no <parent>")))?;
    let child = child.ok_or_else(|| Error::parse(format!("joint '{name}' has no <child>")))?;

    let mut spec = JointSpec::new(name, kind, parent, child)
        .with_origin(origin)
        .with_axis(axis);
    if let Some((lower, upper)) = limits {
        spec = spec.with_limits(lower, upper);
    }
    Ok(spec)
}

fn read_origin(e: &BytesStart) -> Result<Transform> {
    let xyz = attribute_opt(e, "xyz")
        .map(|s| parse_vector3(&s))
        .transpose()?
        .unwrap_or(DVec3::ZERO);
    let rpy = attribute_opt(e, "rpy")
        .map(|s| parse_vector3(&s))
        .transpose()?
        .unwrap_or(DVec3::ZERO);
    Ok(Transform::from_xyz_rpy(xyz.to_array(), rpy.to_array()))
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

fn attribute(e: &BytesStart, name: &str) -> Result<String> {
    attribute_opt(e, name).ok_or_else(|| {
        Error::parse(format!(
            "<{}> is missing attribute '{name}'",
            element_name(e)
        ))
    })
}

fn attribute_opt(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name.as_bytes())
        .and_then(|attr| String::from_utf8(attr.value.to_vec()).ok())
}

fn float_attribute(e: &BytesStart, name: &str) -> Result<f64> {
    parse_float(&attribute(e, name)?, e, name)
}

fn float_attribute_or(e: &BytesStart, name: &str, default: f64) -> Result<f64> {
    match attribute_opt(e, name) {
        Some(value) => parse_float(&value, e, name),
        None => Ok(default),
    }
}

fn parse_float(value: &str, e: &BytesStart, name: &str) -> Result<f64> {
    value.trim().parse().map_err(|_| {
        Error::parse(format!(
            "<{}> attribute '{name}' is not a number: '{value}'",
            element_name(e)
        ))
    })
}

fn parse_vector3(s: &str) -> Result<DVec3> {
    let parts: Vec<f64> = s
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| Error::parse(format!("invalid vector '{s}'")))?;
    match parts.as_slice() {
        [x, y, z] => Ok(DVec3::new(*x, *y, *z)),
        _ => Err(Error::parse(format!(
            "expected 3 values in vector, got {}: '{s}'",
            parts.len()
        ))),
    }
}

/// Skip an element and all its children.
fn skip_element<R: BufRead>(reader: &mut Reader<R>, name: &[u8]) -> Result<()> {
    let mut buf = Vec::new();
    let mut depth = 1;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == name => depth += 1,
            Ok(Event::End(ref e)) if e.name().as_ref() == name => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Ok(Event::Eof) => return Err(xml_error("unexpected end of document")),
            Ok(_) => {}
            Err(e) => return Err(xml_error(e)),
        }
        buf.clear();
    }

    Ok(())
}
