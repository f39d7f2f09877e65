//! Row grammar for each model kind
//!
//! A row is the ordered field list of one model, as emitted by the capture
//! queries (one `;`-delimited string per tuple) and as stored in data
//! extension files (one YAML sequence per entry). Column order per kind:
//!
//! | kind    | columns                                                                      |
//! |---------|------------------------------------------------------------------------------|
//! | summary | package, type, subtypes, name, signature, ext, input, output, kind, provenance |
//! | sink    | package, type, subtypes, name, signature, ext, input, kind, provenance        |
//! | source  | package, type, subtypes, name, signature, ext, output, kind, provenance       |
//! | neutral | package, type, name, signature, provenance                                   |
//!
//! Readers never panic: a wrong field count or an invalid field yields `None`.

use serde_yaml::Value;

use super::{MethodSignature, ModelKind, ModeledMethod, Provenance, SummaryKind};

/// Field separator inside a captured tuple
pub const FIELD_SEPARATOR: char = ';';

/// How a reader treats blank access paths and kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Blank {
    /// Capture queries never emit blank fields; one marks a broken tuple
    Reject,
    /// Data extension files may carry blank fields written from a model map
    Accept,
}

impl Blank {
    fn field(self, s: &str) -> Option<String> {
        match self {
            Blank::Reject if s.is_empty() => None,
            _ => Some(s.to_string()),
        }
    }
}

/// Parse one raw tuple string for `kind`
pub fn parse_tuple(kind: ModelKind, raw: &str) -> Option<(MethodSignature, ModeledMethod)> {
    let fields: Vec<&str> = raw.split(FIELD_SEPARATOR).collect();
    read_modeled_method(kind, &fields)
}

/// Map an ordered field list of a captured tuple to a signature and model
///
/// Blank input, output or kind fields make the tuple unparseable.
pub fn read_modeled_method(
    kind: ModelKind,
    row: &[&str],
) -> Option<(MethodSignature, ModeledMethod)> {
    read_row(kind, row, Blank::Reject)
}

fn read_row(kind: ModelKind, row: &[&str], blank: Blank) -> Option<(MethodSignature, ModeledMethod)> {
    match kind {
        ModelKind::Summary => read_summary(row, blank),
        ModelKind::Sink => read_sink(row, blank),
        ModelKind::Source => read_source(row, blank),
        ModelKind::Neutral => read_neutral(row),
    }
}

fn read_summary(row: &[&str], blank: Blank) -> Option<(MethodSignature, ModeledMethod)> {
    let &[package, type_name, subtypes, name, parameters, _ext, input, output, kind, provenance] =
        row
    else {
        return None;
    };
    parse_subtypes(subtypes)?;

    let method = ModeledMethod::Summary {
        input: blank.field(input)?,
        output: blank.field(output)?,
        kind: SummaryKind::parse(kind)?,
        provenance: Provenance::parse(provenance)?,
    };
    Some((MethodSignature::new(package, type_name, name, parameters)?, method))
}

fn read_sink(row: &[&str], blank: Blank) -> Option<(MethodSignature, ModeledMethod)> {
    let &[package, type_name, subtypes, name, parameters, _ext, input, kind, provenance] = row
    else {
        return None;
    };
    parse_subtypes(subtypes)?;

    let method = ModeledMethod::Sink {
        input: blank.field(input)?,
        kind: blank.field(kind)?,
        provenance: Provenance::parse(provenance)?,
    };
    Some((MethodSignature::new(package, type_name, name, parameters)?, method))
}

fn read_source(row: &[&str], blank: Blank) -> Option<(MethodSignature, ModeledMethod)> {
    let &[package, type_name, subtypes, name, parameters, _ext, output, kind, provenance] = row
    else {
        return None;
    };
    parse_subtypes(subtypes)?;

    let method = ModeledMethod::Source {
        output: blank.field(output)?,
        kind: blank.field(kind)?,
        provenance: Provenance::parse(provenance)?,
    };
    Some((MethodSignature::new(package, type_name, name, parameters)?, method))
}

fn read_neutral(row: &[&str]) -> Option<(MethodSignature, ModeledMethod)> {
    let &[package, type_name, name, parameters, provenance] = row else {
        return None;
    };

    let method = ModeledMethod::Neutral {
        provenance: Provenance::parse(provenance)?,
    };
    Some((MethodSignature::new(package, type_name, name, parameters)?, method))
}

fn parse_subtypes(s: &str) -> Option<bool> {
    match s {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn text(s: &str) -> Value {
    Value::String(s.to_string())
}

/// Render a model as a data extension row
///
/// Returns `None` for [`ModeledMethod::None`], which is never persisted.
/// `subtypes` is always written as `true` and `ext` as blank; neither is part
/// of the model, so a `subtypes: false` row read from disk is saved back as
/// `true`.
pub fn write_modeled_method(
    signature: &MethodSignature,
    method: &ModeledMethod,
) -> Option<(ModelKind, Vec<Value>)> {
    let head = || {
        vec![
            text(signature.package()),
            text(signature.type_name()),
            Value::Bool(true),
            text(signature.name()),
            text(signature.parameters()),
            text(""),
        ]
    };

    match method {
        ModeledMethod::Summary {
            input,
            output,
            kind,
            provenance,
        } => {
            let mut row = head();
            row.extend([text(input), text(output), text(kind.as_str()), text(provenance.as_str())]);
            Some((ModelKind::Summary, row))
        }
        ModeledMethod::Sink {
            input,
            kind,
            provenance,
        } => {
            let mut row = head();
            row.extend([text(input), text(kind), text(provenance.as_str())]);
            Some((ModelKind::Sink, row))
        }
        ModeledMethod::Source {
            output,
            kind,
            provenance,
        } => {
            let mut row = head();
            row.extend([text(output), text(kind), text(provenance.as_str())]);
            Some((ModelKind::Source, row))
        }
        ModeledMethod::Neutral { provenance } => Some((
            ModelKind::Neutral,
            vec![
                text(signature.package()),
                text(signature.type_name()),
                text(signature.name()),
                text(signature.parameters()),
                text(provenance.as_str()),
            ],
        )),
        ModeledMethod::None => None,
    }
}

/// Read a data extension row of scalar YAML values
///
/// Booleans and numbers are accepted in place of their string spelling; any
/// nested value makes the row unparseable. Blank access paths and kinds are
/// kept, so every row [`write_modeled_method`] produces reads back unchanged.
pub fn read_yaml_row(kind: ModelKind, row: &[Value]) -> Option<(MethodSignature, ModeledMethod)> {
    let fields = row
        .iter()
        .map(|value| match value {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect::<Option<Vec<String>>>()?;
    let fields: Vec<&str> = fields.iter().map(String::as_str).collect();

    read_row(kind, &fields, Blank::Accept)
}
