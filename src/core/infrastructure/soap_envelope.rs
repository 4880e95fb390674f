//! SOAP 1.1 envelope encoding and decoding.
//!
//! GridServer publishes its admin services as wrapped document/literal Axis
//! endpoints: the body of every request and response holds exactly one
//! element. Requests carry no header and no parameters. Responses are parsed
//! into a small element tree and the single body child is classified as
//! payload or fault before the typed response is extracted from it.

use crate::core::domain::{
    error::{ExporterError, ExporterResult},
    model::soap_fault::SoapFault,
};
use quick_xml::{
    Writer,
    events::{BytesEnd, BytesStart, Event},
    name::{Namespace, ResolveResult},
    reader::NsReader,
};

/// Namespace of the SOAP 1.1 envelope.
pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Namespace of the GridServer admin web services.
pub const ADMIN_NS: &str = "http://admin.gridserver.webservices.datasynapse.com";

/// A request element sent as the sole content of the SOAP body.
pub trait SoapRequest {
    /// Local name of the request element, which is also the operation name.
    const ELEMENT: &'static str;

    /// The response this request is answered with.
    type Response: SoapResponse;
}

/// A response element decoded from the SOAP body.
pub trait SoapResponse: Sized {
    /// Local name of the response element.
    const ELEMENT: &'static str;

    /// Builds the typed response from the body payload element.
    ///
    /// The element name and namespace have already been checked.
    fn from_payload(payload: &XmlElement) -> ExporterResult<Self>;
}

/// A parsed XML element: namespace, local name, text and children.
///
/// Only what the admin services use is kept; attributes other than
/// `xsi:nil` are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub namespace: Option<String>,
    pub name: String,
    pub text: String,
    pub nil: bool,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Returns true if the element has the given namespace and local name.
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    /// Returns the first child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Returns every child with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Concatenates the text of this element and all its descendants.
    pub fn text_content(&self) -> String {
        let mut text = self.text.clone();
        for child in &self.children {
            text.push_str(&child.text_content());
        }
        text
    }

    fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{{{}}}{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

/// What a SOAP body holds.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyContent {
    Payload(XmlElement),
    Fault(SoapFault),
    /// The body does not hold exactly one element.
    Malformed(String),
}

/// A decoded response: either the typed payload or a SOAP fault.
#[derive(Debug, Clone, PartialEq)]
pub enum SoapBody<T> {
    Payload(T),
    Fault(SoapFault),
}

/// Serializes a request into a SOAP envelope.
///
/// # Errors
/// Returns [`ExporterError::Encode`] if the XML writer fails.
pub fn encode_request<R: SoapRequest>(_request: &R) -> ExporterResult<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    let events = [
        Event::Start(BytesStart::new("Envelope").with_attributes([("xmlns", SOAP_ENV_NS)])),
        Event::Start(BytesStart::new("Body")),
        Event::Empty(BytesStart::new(R::ELEMENT).with_attributes([("xmlns", ADMIN_NS)])),
        Event::End(BytesEnd::new("Body")),
        Event::End(BytesEnd::new("Envelope")),
    ];
    for event in events {
        writer
            .write_event(event)
            .map_err(|e| ExporterError::Encode(e.to_string()))?;
    }
    Ok(writer.into_inner())
}

/// Decodes a raw response into the expected payload or a fault.
///
/// # Errors
/// - [`ExporterError::EmptyResponse`] for a zero byte response
/// - [`ExporterError::MalformedEnvelope`] if the buffer is not a SOAP
///   envelope with exactly one body element
/// - [`ExporterError::Decode`] if the payload is not the expected response
pub fn decode_response<T: SoapResponse>(raw: &[u8]) -> ExporterResult<SoapBody<T>> {
    match decode_envelope(raw)? {
        BodyContent::Payload(payload) => {
            if !payload.is(ADMIN_NS, T::ELEMENT) {
                return Err(ExporterError::Decode(format!(
                    "expected element {{{}}}{}, found {}",
                    ADMIN_NS,
                    T::ELEMENT,
                    payload.qualified_name()
                )));
            }
            T::from_payload(&payload).map(SoapBody::Payload)
        }
        BodyContent::Fault(fault) => Ok(SoapBody::Fault(fault)),
        BodyContent::Malformed(reason) => Err(ExporterError::MalformedEnvelope(reason)),
    }
}

/// Parses an envelope and classifies the content of its body.
///
/// # Errors
/// Fails for empty input, XML syntax errors and documents whose root is not a
/// SOAP envelope. Problems with the body itself are reported as
/// [`BodyContent::Malformed`].
pub fn decode_envelope(raw: &[u8]) -> ExporterResult<BodyContent> {
    if raw.is_empty() {
        return Err(ExporterError::EmptyResponse);
    }

    let root = parse_document(raw).map_err(ExporterError::MalformedEnvelope)?;
    if !root.is(SOAP_ENV_NS, "Envelope") {
        return Err(ExporterError::MalformedEnvelope(format!(
            "expected element {{{}}}Envelope, found {}",
            SOAP_ENV_NS,
            root.qualified_name()
        )));
    }

    let Some(body) = root.children.into_iter().find(|c| c.is(SOAP_ENV_NS, "Body")) else {
        return Ok(BodyContent::Malformed(
            "SOAP envelope has no body".to_string(),
        ));
    };

    Ok(classify_body(body))
}

fn classify_body(body: XmlElement) -> BodyContent {
    let mut children = body.children.into_iter();
    match (children.next(), children.next()) {
        (None, _) => BodyContent::Malformed("SOAP body is empty".to_string()),
        (Some(_), Some(_)) => BodyContent::Malformed(
            "found multiple elements inside SOAP body; not wrapped-document/literal WS-I compliant"
                .to_string(),
        ),
        (Some(element), None) if element.is(SOAP_ENV_NS, "Fault") => {
            BodyContent::Fault(parse_fault(&element))
        }
        (Some(element), None) => BodyContent::Payload(element),
    }
}

fn parse_fault(element: &XmlElement) -> SoapFault {
    let text = |name: &str| {
        element
            .child(name)
            .map(XmlElement::text_content)
            .unwrap_or_default()
    };
    SoapFault {
        code: text("faultcode"),
        string: text("faultstring"),
        actor: text("faultactor"),
        detail: text("detail"),
    }
}

/// Reads a whole document into an element tree and returns its root.
fn parse_document(raw: &[u8]) -> Result<XmlElement, String> {
    let mut reader = NsReader::from_reader(raw);
    reader.config_mut().trim_text(true);

    let mut open: Vec<XmlElement> = Vec::new();
    loop {
        let (namespace, event) = match reader.read_resolved_event() {
            Ok(resolved) => resolved,
            Err(e) => return Err(format!("XML syntax error: {}", e)),
        };
        match event {
            Event::Start(start) => open.push(start_element(&namespace, &start)),
            Event::Empty(start) => {
                let element = start_element(&namespace, &start);
                match open.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
            Event::End(_) => {
                let element = open
                    .pop()
                    .ok_or_else(|| "unexpected closing tag".to_string())?;
                match open.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| format!("invalid character data: {}", e))?;
                if let Some(current) = open.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(current) = open.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => return Err("unexpected end of document".to_string()),
            _ => {}
        }
    }
}

fn start_element(namespace: &ResolveResult<'_>, start: &BytesStart<'_>) -> XmlElement {
    let namespace = match namespace {
        ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
        _ => None,
    };
    let nil = start.attributes().flatten().any(|attr| {
        attr.key.local_name().as_ref() == b"nil" && attr.value.as_ref() == b"true"
    });
    XmlElement {
        namespace,
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        nil,
        ..Default::default()
    }
}
