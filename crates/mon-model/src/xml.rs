//! XML response formatting.
//!
//! The alternate XML wire format wraps the payload in a single root element
//! (the framework uses `<mon>`), with objects becoming nested elements,
//! arrays becoming repeated `<item>` elements, and scalars becoming text
//! content. Output is UTF-8 with an XML declaration.

use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};

/// Errors that can occur while writing XML response bodies.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// An I/O error during XML writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An error from the underlying quick-xml library.
    #[error("XML processing error: {0}")]
    QuickXml(#[from] quick_xml::Error),
}

/// Serialize a JSON value as an XML document under the given root element.
pub fn to_xml(root: &str, value: &serde_json::Value) -> Result<Vec<u8>, XmlError> {
    let mut buf = Vec::with_capacity(256);
    let mut writer = Writer::new(&mut buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer
        .create_element(root)
        .write_inner_content(|w| write_value(w, value))?;

    Ok(buf)
}

/// Write one JSON value as XML child content.
fn write_value<W: Write>(writer: &mut Writer<W>, value: &serde_json::Value) -> io::Result<()> {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                write_element(writer, key, child)?;
            }
            Ok(())
        }
        serde_json::Value::Array(items) => {
            for item in items {
                write_element(writer, "item", item)?;
            }
            Ok(())
        }
        scalar => write_scalar(writer, scalar),
    }
}

/// Write `<tag>...</tag>` for one child value.
fn write_element<W: Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: &serde_json::Value,
) -> io::Result<()> {
    match value {
        serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
            writer
                .create_element(tag)
                .write_inner_content(|w| write_value(w, value))?;
        }
        scalar => {
            writer
                .create_element(tag)
                .write_text_content(BytesText::new(&scalar_text(scalar)))?;
        }
    }
    Ok(())
}

/// Write a bare scalar as text content.
fn write_scalar<W: Write>(writer: &mut Writer<W>, value: &serde_json::Value) -> io::Result<()> {
    writer.write_event(Event::Text(BytesText::new(&scalar_text(value))))?;
    Ok(())
}

/// The text form of a scalar JSON value, without surrounding quotes.
fn scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
