//! Parser for the `query/device-info` document
//!
//! The document is a flat XML element whose children are the fields:
//!
//! ```xml
//! <device-info>
//!   <friendly-device-name>Living Room</friendly-device-name>
//!   <power-mode>PowerOn</power-mode>
//!   <is-tv>true</is-tv>
//! </device-info>
//! ```
//!
//! Anything nested deeper than the direct children is ignored.

use std::collections::HashMap;

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::{events::Event, Error as XmlError, Reader};
use thiserror::Error;

use crate::models::DeviceInfo;

const ROOT_ELEMENT: &str = "device-info";

#[derive(Debug, Error)]
pub enum DeviceInfoError {
    #[error("XML parsing error: {0}")]
    Xml(#[from] XmlError),

    #[error("Expected <device-info> root element, found <{0}>")]
    UnexpectedRoot(String),

    #[error("Document has no root element")]
    Empty,
}

/// Parse a device-info document into a flat field map
pub fn parse_device_info(xml: &str) -> Result<DeviceInfo, DeviceInfoError> {
    let mut reader = Reader::from_str(xml);

    let mut fields = HashMap::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut current: Option<(String, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                depth += 1;
                match depth {
                    1 => {
                        if name != ROOT_ELEMENT {
                            return Err(DeviceInfoError::UnexpectedRoot(name));
                        }
                        saw_root = true;
                    }
                    2 => current = Some((name, String::new())),
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match depth {
                    0 => {
                        if name != ROOT_ELEMENT {
                            return Err(DeviceInfoError::UnexpectedRoot(name));
                        }
                        saw_root = true;
                    }
                    1 => {
                        fields.insert(name, String::new());
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                if depth == 2 {
                    if let Some((_, value)) = current.as_mut() {
                        // entities arrive separately as GeneralRef
                        let text = e.decode().map_err(XmlError::Encoding)?;
                        value.push_str(&text);
                    }
                }
            }
            Event::CData(e) => {
                if depth == 2 {
                    if let Some((_, value)) = current.as_mut() {
                        value.push_str(&String::from_utf8_lossy(&e));
                    }
                }
            }
            Event::GeneralRef(e) => {
                if depth == 2 {
                    if let Some((_, value)) = current.as_mut() {
                        if let Ok(Some(c)) = e.resolve_char_ref() {
                            value.push(c);
                        } else {
                            let entity = e.decode().map_err(XmlError::Encoding)?;
                            match resolve_predefined_entity(&entity) {
                                Some(resolved) => value.push_str(resolved),
                                None => {
                                    value.push('&');
                                    value.push_str(&entity);
                                    value.push(';');
                                }
                            }
                        }
                    }
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    if let Some((name, value)) = current.take() {
                        fields.insert(name, value.trim().to_string());
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(DeviceInfoError::Empty);
    }

    Ok(DeviceInfo::new(fields))
}
