use crate::format::{Field, Format, Repeat};

/// Describe each logical argument of `format` with a type name.
///
/// Yields one entry per argument the format takes: `uint32`, `string`,
/// `bytes`, `(uint8, uint16)` for a group. Wildcard fields are marked with
/// a trailing `[]`; a repeated group is one argument, marked `[n]`.
pub fn annotations(format: &Format) -> Vec<String> {
    let mut out = Vec::new();
    annotate_fields(format.fields(), &mut out);
    out
}

fn annotate_fields(fields: &[Field], out: &mut Vec<String>) {
    for field in fields {
        match field {
            Field::Primitive { kind, repeat } if !field.is_padding() => {
                push_repeated(kind.name(), *repeat, out)
            }
            Field::Primitive { .. } => {}
            Field::CString { repeat } => push_repeated("string", *repeat, out),
            Field::RawBytes { .. } => out.push("bytes".to_string()),
            Field::Group { fields, repeat } => {
                let mut inner = Vec::new();
                annotate_fields(fields, &mut inner);
                let body = format!("({})", inner.join(", "));
                out.push(match repeat {
                    Repeat::Once => body,
                    Repeat::Count(n) => format!("{body}[{n}]"),
                    Repeat::Wildcard => format!("{body}[]"),
                });
            }
        }
    }
}

fn push_repeated(name: &str, repeat: Repeat, out: &mut Vec<String>) {
    match repeat {
        Repeat::Once => out.push(name.to_string()),
        Repeat::Count(n) => out.extend(std::iter::repeat(name.to_string()).take(n)),
        Repeat::Wildcard => out.push(format!("{name}[]")),
    }
}

/// Whether an annotation describes a variadic argument.
pub fn is_variadic(annotation: &str) -> bool {
    annotation.ends_with("[]")
}
