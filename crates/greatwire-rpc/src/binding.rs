use std::fmt;
use std::sync::Arc;

use greatwire_format::{annotate, annotations, Format, FormatError, Reply, Value};
use greatwire_transport::Transport;
use serde::Serialize;

use crate::config::CallOptions;
use crate::error::Result;
use crate::session::Session;

/// A callable verb: fixed class and verb numbers with parsed formats.
///
/// Bindings are built statically (the core API) or from discovery, and
/// invoked against any [`Session`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcBinding {
    pub class_number: u32,
    pub verb_number: u32,
    pub name: String,
    #[serde(serialize_with = "serialize_format")]
    pub in_format: Arc<Format>,
    #[serde(serialize_with = "serialize_format")]
    pub out_format: Arc<Format>,
    pub doc: String,
    pub in_param_names: Option<Vec<String>>,
    pub out_param_names: Option<Vec<String>>,
    /// Options applied to every call unless overridden by the caller.
    #[serde(skip)]
    pub defaults: CallOptions,
}

impl RpcBinding {
    /// Build a binding, parsing both format strings.
    pub fn new(
        class_number: u32,
        verb_number: u32,
        name: impl Into<String>,
        in_format: &str,
        out_format: &str,
    ) -> std::result::Result<Self, FormatError> {
        Ok(Self {
            class_number,
            verb_number,
            name: name.into(),
            in_format: Arc::new(Format::parse(in_format)?),
            out_format: Arc::new(Format::parse(out_format)?),
            doc: String::new(),
            in_param_names: None,
            out_param_names: None,
            defaults: CallOptions::default(),
        })
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn with_param_names(
        mut self,
        in_names: Option<Vec<String>>,
        out_names: Option<Vec<String>>,
    ) -> Self {
        self.in_param_names = in_names;
        self.out_param_names = out_names;
        self
    }

    pub fn with_defaults(mut self, defaults: CallOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Encode `args`, execute the verb and decode its reply.
    pub fn invoke<T: Transport>(&self, session: &mut Session<T>, args: &[Value]) -> Result<Reply> {
        self.invoke_with(session, args, &CallOptions::default())
    }

    pub fn invoke_with<T: Transport>(
        &self,
        session: &mut Session<T>,
        args: &[Value],
        options: &CallOptions,
    ) -> Result<Reply> {
        let options = options.or(self.defaults);
        session.execute_formats(
            self.class_number,
            self.verb_number,
            &self.in_format,
            &self.out_format,
            args,
            &options,
            &self.name,
        )
    }

    /// Named, typed parameters: `class_number: uint32`.
    pub fn parameters(&self) -> Vec<String> {
        annotations(&self.in_format)
            .into_iter()
            .enumerate()
            .map(|(index, annotation)| {
                let name = param_name(&self.in_param_names, index)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("arg{}", index + 1));
                let prefix = variadic_prefix(&annotation);
                format!("{prefix}{name}: {annotation}")
            })
            .collect()
    }

    /// Named, typed results; unnamed results render as just their type.
    pub fn results(&self) -> Vec<String> {
        annotations(&self.out_format)
            .into_iter()
            .enumerate()
            .map(|(index, annotation)| {
                let prefix = variadic_prefix(&annotation);
                match param_name(&self.out_param_names, index) {
                    Some(name) => format!("{prefix}{name}: {annotation}"),
                    None => format!("{prefix}{annotation}"),
                }
            })
            .collect()
    }

    /// Human-readable signature: `get_verb_name(class_number: uint32, ...) -> name: string`.
    pub fn signature(&self) -> String {
        let mut signature = format!("{}({})", self.name, self.parameters().join(", "));
        let results = self.results();
        if !results.is_empty() {
            signature.push_str(" -> ");
            signature.push_str(&results.join(", "));
        }
        signature
    }
}

impl fmt::Display for RpcBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

fn param_name(names: &Option<Vec<String>>, index: usize) -> Option<&str> {
    names
        .as_ref()
        .and_then(|names| names.get(index))
        .map(String::as_str)
        .filter(|name| !name.is_empty())
}

fn serialize_format<S: serde::Serializer>(
    format: &Arc<Format>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(format.source())
}

fn variadic_prefix(annotation: &str) -> &'static str {
    if annotate::is_variadic(annotation) {
        "*"
    } else {
        ""
    }
}

/// Parse a comma-separated parameter-name string.
///
/// The sentinel `*` means the device has no names for the verb.
pub fn parse_param_names(names: &str) -> Option<Vec<String>> {
    if names.trim() == "*" {
        return None;
    }
    if names.trim().is_empty() {
        return Some(Vec::new());
    }
    let names = names.split(',').map(|name| name.trim().to_string());
    Some(names.collect())
}
