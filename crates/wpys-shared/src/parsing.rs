//! # Input Parsing
//!
//! Typed coercion of wire-format input values per declared Domain/Format.
//! The wire layer (XML/KVP decoding) lives outside this crate; what arrives
//! here is already split into an identifier, a raw value string, and
//! optional mime-type/schema/encoding attributes from a `WireInput`.

use std::sync::Arc;

use crate::errors::{WpysError, WpysResult};
use crate::model::{DataKind, Domain, Format, InputDescriptor};

/// A value parser resolved by name from a format or descriptor's
/// `value_parser` field. Parsers are registered by the process author and
/// looked up through a `ParserTable` supplied by the caller.
pub type ValueParser = Arc<dyn Fn(&str) -> WpysResult<f64> + Send + Sync>;

#[derive(Default, Clone)]
pub struct ParserTable {
    parsers: std::collections::HashMap<String, ValueParser>,
}

impl ParserTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, parser: ValueParser) {
        self.parsers.insert(name.into(), parser);
    }

    fn get(&self, name: &str) -> Option<&ValueParser> {
        self.parsers.get(name)
    }
}

/// What arrives on the wire for one `<wps:Input>` before this module touches it.
#[derive(Debug, Clone)]
pub struct WireInput {
    pub identifier: String,
    pub raw_value: String,
    pub mime_type: Option<String>,
}

/// The result of parsing one input: a canonical value ready for a process body.
#[derive(Debug, Clone)]
pub enum ParsedValue {
    Literal(f64),
    /// BoundingBox/Complex inputs are passed through as opaque bytes tagged
    /// with the resolved format; this crate does not interpret them further.
    Opaque { bytes: String, mime_type: String },
}

/// Splits `value@key=val@key=val...` into the leading value and a parameter map.
fn split_parameters(raw: &str) -> (&str, std::collections::HashMap<&str, &str>) {
    let mut segments = raw.split('@');
    let value = segments.next().unwrap_or("");
    let mut params = std::collections::HashMap::new();
    for segment in segments {
        if let Some((key, val)) = segment.split_once('=') {
            params.insert(key, val);
        }
    }
    (value, params)
}

fn resolve_format<'a>(descriptor: &'a InputDescriptor, mime_type: Option<&str>) -> WpysResult<&'a Format> {
    match mime_type {
        Some(mime) => descriptor
            .formats
            .iter()
            .find(|f| f.mime_type == mime)
            .ok_or_else(|| WpysError::validation_error("mime_type", format!("unknown format: {mime}"))),
        None => descriptor
            .formats
            .first()
            .ok_or_else(|| WpysError::validation_error("formats", "descriptor declares no formats")),
    }
}

fn resolve_domain<'a>(domains: &'a [Domain], uom: Option<&str>) -> WpysResult<&'a Domain> {
    match uom {
        Some(unit) => domains
            .iter()
            .find(|d| d.unit_of_measurement.as_deref() == Some(unit))
            .ok_or_else(|| WpysError::validation_error("uom", format!("unknown unit: {unit}"))),
        None => domains
            .first()
            .ok_or_else(|| WpysError::validation_error("domains", "descriptor declares no domains")),
    }
}

/// Runs the five-step literal-input algorithm: format resolution, domain
/// resolution, value parsing, canonicalization, range check.
pub fn parse_literal_input(
    descriptor: &InputDescriptor,
    wire: &WireInput,
    parsers: &ParserTable,
) -> WpysResult<f64> {
    let (domains, descriptor_value_parser) = match &descriptor.data_kind {
        DataKind::Literal { domains, value_parser } => (domains, value_parser.as_deref()),
        other => {
            return Err(WpysError::validation_error(
                "data_kind",
                format!("{:?} is not a literal input", other),
            ))
        }
    };

    let (raw_value, params) = split_parameters(&wire.raw_value);
    let format = resolve_format(descriptor, wire.mime_type.as_deref())?;
    let domain = resolve_domain(domains, params.get("uom").copied())?;

    let parsed = if let Some(name) = format.value_parser.as_deref() {
        parse_with_named(name, raw_value, parsers)?
    } else if let Some(name) = descriptor_value_parser {
        parse_with_named(name, raw_value, parsers)?
    } else {
        raw_value
            .parse::<f64>()
            .map_err(|_| WpysError::validation_error("value", format!("invalid value: {raw_value}")))?
    };

    let default_domain = &domains[0];
    let is_default = std::ptr::eq(domain, default_domain);
    let canonical = if is_default {
        parsed
    } else if let Some(converter) = domain.to_default_domain.as_ref() {
        converter(parsed)
    } else {
        return Err(WpysError::validation_error(
            "domain",
            "non-default domain has no to_default_domain converter",
        ));
    };

    if let Some((min, max)) = default_domain.allowed_values {
        if canonical < min || canonical > max {
            return Err(WpysError::validation_error(
                "value",
                format!("{canonical} outside allowed range [{min}, {max}]"),
            ));
        }
    }

    Ok(canonical)
}

fn parse_with_named(name: &str, raw_value: &str, parsers: &ParserTable) -> WpysResult<f64> {
    let parser = parsers
        .get(name)
        .ok_or_else(|| WpysError::validation_error("value_parser", format!("unregistered parser: {name}")))?;
    parser(raw_value)
}

/// BoundingBox and Complex inputs are treated as opaque bytes tagged with the
/// resolved format — the hook point the data model leaves for those kinds.
pub fn parse_opaque_input(descriptor: &InputDescriptor, wire: &WireInput) -> WpysResult<ParsedValue> {
    let format = resolve_format(descriptor, wire.mime_type.as_deref())?;
    Ok(ParsedValue::Opaque {
        bytes: wire.raw_value.clone(),
        mime_type: format.mime_type.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metadata;

    fn meter_feet_descriptor() -> InputDescriptor {
        InputDescriptor {
            identifier: "distance".into(),
            metadata: Metadata::default(),
            formats: vec![Format::new("text/plain")],
            data_kind: DataKind::Literal {
                domains: vec![
                    Domain::new("xsd:double").with_unit("meter").with_allowed_values(0.0, 100.0),
                    Domain::new("xsd:double")
                        .with_unit("feet")
                        .with_converter(|v| v * 0.3048),
                ],
                value_parser: None,
            },
        }
    }

    #[test]
    fn default_domain_parses_without_conversion() {
        let descriptor = meter_feet_descriptor();
        let wire = WireInput {
            identifier: "distance".into(),
            raw_value: "10".into(),
            mime_type: None,
        };
        let value = parse_literal_input(&descriptor, &wire, &ParserTable::new()).unwrap();
        assert_eq!(value, 10.0);
    }

    #[test]
    fn uom_parameter_selects_domain_and_converts() {
        let descriptor = meter_feet_descriptor();
        let wire = WireInput {
            identifier: "distance".into(),
            raw_value: "10@uom=feet".into(),
            mime_type: None,
        };
        let value = parse_literal_input(&descriptor, &wire, &ParserTable::new()).unwrap();
        assert!((value - 3.048).abs() < 1e-9);
    }

    #[test]
    fn unknown_uom_fails() {
        let descriptor = meter_feet_descriptor();
        let wire = WireInput {
            identifier: "distance".into(),
            raw_value: "10@uom=parsec".into(),
            mime_type: None,
        };
        let err = parse_literal_input(&descriptor, &wire, &ParserTable::new()).unwrap_err();
        assert!(matches!(err, WpysError::ValidationError { .. }));
    }

    #[test]
    fn value_out_of_range_after_conversion_fails() {
        let descriptor = meter_feet_descriptor();
        let wire = WireInput {
            identifier: "distance".into(),
            raw_value: "400@uom=feet".into(),
            mime_type: None,
        };
        let err = parse_literal_input(&descriptor, &wire, &ParserTable::new()).unwrap_err();
        assert!(matches!(err, WpysError::ValidationError { .. }));
    }

    #[test]
    fn unknown_mime_type_fails() {
        let descriptor = meter_feet_descriptor();
        let wire = WireInput {
            identifier: "distance".into(),
            raw_value: "10".into(),
            mime_type: Some("application/json".into()),
        };
        let err = parse_literal_input(&descriptor, &wire, &ParserTable::new()).unwrap_err();
        assert!(matches!(err, WpysError::ValidationError { .. }));
    }

    #[test]
    fn invalid_numeric_value_fails() {
        let descriptor = meter_feet_descriptor();
        let wire = WireInput {
            identifier: "distance".into(),
            raw_value: "not-a-number".into(),
            mime_type: None,
        };
        let err = parse_literal_input(&descriptor, &wire, &ParserTable::new()).unwrap_err();
        assert!(matches!(err, WpysError::ValidationError { .. }));
    }

    #[test]
    fn descriptor_value_parser_is_used_when_format_declares_none() {
        let mut descriptor = meter_feet_descriptor();
        descriptor.data_kind = DataKind::Literal {
            domains: vec![Domain::new("xsd:double").with_allowed_values(0.0, 100.0)],
            value_parser: Some("half".to_string()),
        };
        let mut parsers = ParserTable::new();
        parsers.register("half", std::sync::Arc::new(|raw: &str| {
            raw.parse::<f64>()
                .map(|v| v / 2.0)
                .map_err(|_| WpysError::validation_error("value", format!("invalid value: {raw}")))
        }));
        let wire = WireInput {
            identifier: "distance".into(),
            raw_value: "10".into(),
            mime_type: None,
        };
        let value = parse_literal_input(&descriptor, &wire, &parsers).unwrap();
        assert_eq!(value, 5.0);
    }

    #[test]
    fn format_value_parser_takes_precedence_over_descriptor_value_parser() {
        let mut descriptor = meter_feet_descriptor();
        descriptor.formats = vec![Format {
            value_parser: Some("double".to_string()),
            ..Format::new("text/plain")
        }];
        descriptor.data_kind = DataKind::Literal {
            domains: vec![Domain::new("xsd:double").with_allowed_values(0.0, 100.0)],
            value_parser: Some("half".to_string()),
        };
        let mut parsers = ParserTable::new();
        parsers.register("double", std::sync::Arc::new(|raw: &str| {
            raw.parse::<f64>()
                .map(|v| v * 2.0)
                .map_err(|_| WpysError::validation_error("value", format!("invalid value: {raw}")))
        }));
        let wire = WireInput {
            identifier: "distance".into(),
            raw_value: "10".into(),
            mime_type: None,
        };
        let value = parse_literal_input(&descriptor, &wire, &parsers).unwrap();
        assert_eq!(value, 20.0);
    }
}
