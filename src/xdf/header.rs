//! Stream header (`<info>` XML) parsing and serialisation.
//!
//! Only the fields the pipeline needs are kept:
//!
//! ```text
//! <info>
//!   <name>NeuroneStream</name>
//!   <type>EEG</type>
//!   <channel_count>75</channel_count>
//!   <nominal_srate>5000</nominal_srate>
//!   <channel_format>float32</channel_format>
//!   <desc><channels><channel><label>Fp1</label>…</channel>…</channels></desc>
//! </info>
//! ```
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;

use crate::error::XdfError;

/// Value encoding of every channel in a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelFormat {
    #[default]
    Float32,
    Double64,
    String,
    Int8,
    Int16,
    Int32,
    Int64,
}

impl ChannelFormat {
    pub fn parse(s: &str) -> Result<Self, XdfError> {
        match s.trim() {
            "float32" => Ok(Self::Float32),
            "double64" => Ok(Self::Double64),
            "string" => Ok(Self::String),
            "int8" => Ok(Self::Int8),
            "int16" => Ok(Self::Int16),
            "int32" => Ok(Self::Int32),
            "int64" => Ok(Self::Int64),
            other => Err(XdfError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Double64 => "double64",
            Self::String => "string",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
        }
    }

    /// Bytes per value, `None` for variable-length strings.
    pub fn value_size(self) -> Option<usize> {
        match self {
            Self::Int8 => Some(1),
            Self::Int16 => Some(2),
            Self::Float32 | Self::Int32 => Some(4),
            Self::Double64 | Self::Int64 => Some(8),
            Self::String => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        self != Self::String
    }
}

/// Parsed stream header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamHeader {
    pub stream_id: u32,
    pub name: String,
    pub stream_type: String,
    pub channel_count: usize,
    /// Nominal sampling rate in Hz; `0.0` marks an irregular (marker) stream.
    pub nominal_srate: f64,
    pub channel_format: ChannelFormat,
    /// Channel labels from `<desc><channels>`; may be empty.
    pub channel_labels: Vec<String>,
}

impl StreamHeader {
    pub fn new(
        stream_id: u32,
        name: &str,
        stream_type: &str,
        channel_count: usize,
        nominal_srate: f64,
        channel_format: ChannelFormat,
    ) -> Self {
        Self {
            stream_id,
            name: name.to_string(),
            stream_type: stream_type.to_string(),
            channel_count,
            nominal_srate,
            channel_format,
            channel_labels: Vec::new(),
        }
    }

    pub fn with_labels<S: AsRef<str>>(mut self, labels: &[S]) -> Self {
        self.channel_labels = labels.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    /// Parse the XML body of a StreamHeader chunk.
    pub fn parse(stream_id: u32, xml: &[u8]) -> Result<Self, XdfError> {
        let xml_str = String::from_utf8_lossy(xml);
        let mut reader = XmlReader::from_str(&xml_str);
        reader.config_mut().trim_text(true);

        let mut header = StreamHeader { stream_id, ..Default::default() };
        let mut path: Vec<String> = Vec::new();
        let mut format: Option<String> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if name == "channel" && in_channels(&path) {
                        header.channel_labels.push(String::new());
                    }
                    path.push(name);
                }
                Ok(Event::End(_)) => {
                    path.pop();
                }
                Ok(Event::Text(e)) => {
                    let raw = String::from_utf8_lossy(&e).into_owned();
                    let text = match quick_xml::escape::unescape(&raw) {
                        Ok(t) => t.into_owned(),
                        Err(_) => raw.clone(),
                    };
                    let p: Vec<&str> = path.iter().map(String::as_str).collect();
                    match p.as_slice() {
                        ["info", "name"] => header.name = text,
                        ["info", "type"] => header.stream_type = text,
                        ["info", "channel_count"] => {
                            header.channel_count = text.trim().parse().map_err(|_| {
                                XdfError::Xml(format!("bad channel_count '{text}'"))
                            })?;
                        }
                        ["info", "nominal_srate"] => {
                            header.nominal_srate = text.trim().parse().map_err(|_| {
                                XdfError::Xml(format!("bad nominal_srate '{text}'"))
                            })?;
                        }
                        ["info", "channel_format"] => format = Some(text),
                        [.., "channels", "channel", "label"] => {
                            if let Some(last) = header.channel_labels.last_mut() {
                                *last = text;
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XdfError::Xml(e.to_string())),
                _ => {}
            }
        }

        header.channel_format = match format {
            Some(f) => ChannelFormat::parse(&f)?,
            None => ChannelFormat::Float32,
        };
        if header.channel_labels.len() != header.channel_count {
            header.channel_labels.clear();
        }
        Ok(header)
    }

    /// Serialise to the `<info>` document written into StreamHeader chunks.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\"?><info>");
        xml.push_str(&format!("<name>{}</name>", escape(&self.name)));
        xml.push_str(&format!("<type>{}</type>", escape(&self.stream_type)));
        xml.push_str(&format!("<channel_count>{}</channel_count>", self.channel_count));
        xml.push_str(&format!("<nominal_srate>{}</nominal_srate>", self.nominal_srate));
        xml.push_str(&format!(
            "<channel_format>{}</channel_format>",
            self.channel_format.as_str()
        ));
        if !self.channel_labels.is_empty() {
            xml.push_str("<desc><channels>");
            for label in &self.channel_labels {
                xml.push_str(&format!("<channel><label>{}</label></channel>", escape(label)));
            }
            xml.push_str("</channels></desc>");
        }
        xml.push_str("</info>");
        xml
    }
}

fn in_channels(path: &[String]) -> bool {
    path.last().map(String::as_str) == Some("channels")
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
