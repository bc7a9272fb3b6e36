//! XML form of pipeline descriptions.
//!
//! ```xml
//! <pipeline>
//!   <algorithm id="make_tetrahedral_mesh" name="mesher">
//!     <default_source>reader</default_source>
//!     <parameter name="cell_size" type="double">0.5</parameter>
//!     <parameter name="geometry" type="dynamic">reader/mesh</parameter>
//!   </algorithm>
//! </pipeline>
//! ```
//!
//! Surrounding whitespace of element text is trimmed. `xml` parameters keep
//! their inner markup verbatim; all other kinds are unescaped. Unknown
//! elements are skipped.

use crate::pipeline::description::{AlgorithmDecl, ParameterDecl, ParameterType, PipelineDescription};
use crate::pipeline::error::{PipelineError, PipelineResult};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt;

fn xml_error(e: impl fmt::Display) -> PipelineError {
    PipelineError::Parse(e.to_string())
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Get an attribute value by name
fn attribute(e: &BytesStart, name: &[u8]) -> PipelineResult<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == name {
            let value = attr.unescape_value().map_err(xml_error)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn required_attribute(e: &BytesStart, name: &str) -> PipelineResult<String> {
    attribute(e, name.as_bytes())?.ok_or_else(|| {
        PipelineError::Parse(format!(
            "<{}> is missing required attribute '{}'",
            element_name(e),
            name
        ))
    })
}

/// Parse a whole `<pipeline>` document.
pub fn parse_pipeline(content: &str) -> PipelineResult<PipelineDescription> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) if e.name().as_ref() == b"pipeline" => {
                return parse_algorithms(&mut reader);
            }
            Event::Empty(e) if e.name().as_ref() == b"pipeline" => {
                return Ok(PipelineDescription::default());
            }
            Event::Start(e) | Event::Empty(e) => {
                return Err(PipelineError::Parse(format!(
                    "expected <pipeline> root element, found <{}>",
                    element_name(&e)
                )));
            }
            Event::Eof => {
                return Err(PipelineError::Parse(
                    "missing <pipeline> root element".to_string(),
                ));
            }
            // Declaration, comments, doctype
            _ => {}
        }
    }
}

fn parse_algorithms(reader: &mut Reader<&[u8]>) -> PipelineResult<PipelineDescription> {
    let mut description = PipelineDescription::default();
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) if e.name().as_ref() == b"algorithm" => {
                let decl = algorithm_header(&e)?;
                description.algorithms.push(parse_algorithm(reader, decl)?);
            }
            Event::Empty(e) if e.name().as_ref() == b"algorithm" => {
                description.algorithms.push(algorithm_header(&e)?);
            }
            Event::Start(e) => {
                tracing::debug!("Skipping <{}> in pipeline", element_name(&e));
                reader.read_to_end(e.name()).map_err(xml_error)?;
            }
            Event::End(_) => return Ok(description),
            Event::Eof => {
                return Err(PipelineError::Parse(
                    "unexpected end of document inside <pipeline>".to_string(),
                ));
            }
            _ => {}
        }
    }
}

fn algorithm_header(e: &BytesStart) -> PipelineResult<AlgorithmDecl> {
    Ok(AlgorithmDecl::new(
        required_attribute(e, "id")?,
        required_attribute(e, "name")?,
    ))
}

fn parse_algorithm(
    reader: &mut Reader<&[u8]>,
    mut decl: AlgorithmDecl,
) -> PipelineResult<AlgorithmDecl> {
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => match e.name().as_ref() {
                b"default_source" => {
                    let raw = reader.read_text(e.name()).map_err(xml_error)?;
                    let source = unescape(raw.trim()).map_err(xml_error)?;
                    decl.default_source = Some(source.into_owned());
                }
                b"parameter" => {
                    let (name, kind) = parameter_header(&e)?;
                    let raw = reader.read_text(e.name()).map_err(xml_error)?;
                    let value = parameter_value(kind, &raw)?;
                    decl.parameters.push(ParameterDecl::new(name, kind, value));
                }
                _ => {
                    tracing::debug!(
                        "Skipping <{}> in algorithm '{}'",
                        element_name(&e),
                        decl.name
                    );
                    reader.read_to_end(e.name()).map_err(xml_error)?;
                }
            },
            Event::Empty(e) if e.name().as_ref() == b"parameter" => {
                let (name, kind) = parameter_header(&e)?;
                decl.parameters.push(ParameterDecl::new(name, kind, ""));
            }
            Event::End(_) => return Ok(decl),
            Event::Eof => {
                return Err(PipelineError::Parse(format!(
                    "unexpected end of document inside algorithm '{}'",
                    decl.name
                )));
            }
            _ => {}
        }
    }
}

fn parameter_header(e: &BytesStart) -> PipelineResult<(String, ParameterType)> {
    let name = required_attribute(e, "name")?;
    let kind: ParameterType = required_attribute(e, "type")?.parse()?;
    Ok((name, kind))
}

fn parameter_value(kind: ParameterType, raw: &str) -> PipelineResult<String> {
    let raw = raw.trim();
    match kind {
        ParameterType::Xml => Ok(raw.to_string()),
        _ => Ok(unescape(raw).map_err(xml_error)?.into_owned()),
    }
}
