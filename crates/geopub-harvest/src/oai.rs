use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{HarvestError, Result};
use crate::record::RawRecord;

/// Parse an OAI-PMH ListRecords response into raw records.
///
/// Each `<record>`'s Dublin Core children are collected under their
/// qualified names. The OAI `<header>` block is skipped so its protocol
/// identifier never shadows `dc:identifier`. Unparsable XML or a response
/// without records is a run-level failure.
pub fn parse_oai_records(xml: &str) -> Result<Vec<RawRecord>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut current: Option<RawRecord> = None;
    let mut field: Option<String> = None;

    loop {
        match reader
            .read_event()
            .map_err(|e| HarvestError::Parse(format!("invalid OAI-PMH XML: {e}")))?
        {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
                if name == "record" {
                    current = Some(RawRecord::new());
                } else if current.is_some() {
                    if name == "header" {
                        reader
                            .read_to_end(start.name())
                            .map_err(|e| HarvestError::Parse(format!("invalid OAI-PMH XML: {e}")))?;
                    } else {
                        field = Some(name);
                    }
                }
            }
            Event::Text(text) => {
                if let (Some(record), Some(name)) = (current.as_mut(), field.as_deref()) {
                    let value = text
                        .unescape()
                        .map_err(|e| HarvestError::Parse(format!("invalid OAI-PMH XML: {e}")))?;
                    record.push(name, value.as_ref());
                }
            }
            Event::CData(data) => {
                if let (Some(record), Some(name)) = (current.as_mut(), field.as_deref()) {
                    let value = String::from_utf8_lossy(&data).to_string();
                    record.push(name, value);
                }
            }
            Event::End(end) => {
                if end.name().as_ref() == b"record" {
                    if let Some(record) = current.take() {
                        records.push(record);
                    }
                } else {
                    field = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if records.is_empty() {
        return Err(HarvestError::NoRecords);
    }
    Ok(records)
}
