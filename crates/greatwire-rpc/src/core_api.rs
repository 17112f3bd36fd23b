//! The core API (class 0), which every libgreat device implements.

use greatwire_format::{FormatError, Reply, Value};
use greatwire_transport::Transport;

use crate::binding::RpcBinding;
use crate::config::CallOptions;
use crate::error::{Result, RpcError};
use crate::session::Session;

pub const CORE_CLASS_NUMBER: u32 = 0;
pub const CORE_CLASS_NAME: &str = "core";
pub const CORE_CLASS_DOCS: &str = "Core API, which all libgreat devices must support.";

/// Which part of a verb's description to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DescriptorKind {
    OutSignature = 0,
    InSignature = 1,
    Doc = 2,
    OutParamNames = 3,
    InParamNames = 4,
}

/// A statically known core verb.
#[derive(Debug, Clone, Copy)]
pub struct CoreVerb {
    pub number: u32,
    pub name: &'static str,
    pub in_format: &'static str,
    pub out_format: &'static str,
    pub doc: &'static str,
    pub in_param_names: &'static [&'static str],
    pub out_param_names: &'static [&'static str],
    pub expects_response: bool,
}

macro_rules! core_verb {
    ($number:expr, $name:literal, $in:literal => $out:literal, $doc:literal, [$($in_name:literal),*] => [$($out_name:literal),*]) => {
        CoreVerb {
            number: $number,
            name: $name,
            in_format: $in,
            out_format: $out,
            doc: $doc,
            in_param_names: &[$($in_name),*],
            out_param_names: &[$($out_name),*],
            expects_response: true,
        }
    };
}

pub const READ_BOARD_ID: CoreVerb = core_verb!(0x0, "read_board_id", "" => "<I",
    "Fetches the board's type identifier.", [] => ["id"]);
pub const READ_VERSION_STRING: CoreVerb = core_verb!(0x1, "read_version_string", "" => "<S",
    "Fetches the board's version.", [] => ["version"]);
pub const READ_PART_ID: CoreVerb = core_verb!(0x2, "read_part_id", "" => "<2I",
    "Fetches the part ID used on the board.", [] => ["part_id"]);
pub const READ_SERIAL_NUMBER: CoreVerb = core_verb!(0x3, "read_serial_number", "" => "<4I",
    "Fetches the board's serial number.", [] => ["serial_number"]);
pub const GET_AVAILABLE_CLASSES: CoreVerb = core_verb!(0x4, "get_available_classes", "" => "<*I",
    "Fetches the available class numbers.", [] => ["numbers"]);
pub const GET_AVAILABLE_VERBS: CoreVerb = core_verb!(0x5, "get_available_verbs", "<I" => "<*I",
    "Fetches the available verb numbers for a given class.", ["class_number"] => ["numbers"]);
pub const GET_VERB_NAME: CoreVerb = core_verb!(0x6, "get_verb_name", "<II" => "<S",
    "Fetches the string name for the given verb.", ["class_number", "verb_number"] => ["name"]);
pub const GET_VERB_DESCRIPTOR: CoreVerb = core_verb!(0x7, "get_verb_descriptor", "<IIB" => "<S",
    "Fetches information about the given verb.",
    ["class_number", "verb_number", "descriptor_number"] => ["descriptor"]);
pub const GET_CLASS_NAME: CoreVerb = core_verb!(0x8, "get_class_name", "<I" => "<S",
    "Fetches the string name for the given class.", ["class_number"] => ["name"]);
pub const GET_CLASS_DOCS: CoreVerb = core_verb!(0x9, "get_class_docs", "<I" => "<S",
    "Fetches the documentation for the given class.", ["class_number"] => ["docstring"]);
pub const REQUEST_RESET: CoreVerb = CoreVerb {
    expects_response: false,
    ..core_verb!(0x20, "request_reset", "<I" => "",
        "Resets the relevant board.", ["reset_type"] => [])
};

/// Every core verb, in verb-number order.
pub const CORE_VERBS: &[CoreVerb] = &[
    READ_BOARD_ID,
    READ_VERSION_STRING,
    READ_PART_ID,
    READ_SERIAL_NUMBER,
    GET_AVAILABLE_CLASSES,
    GET_AVAILABLE_VERBS,
    GET_VERB_NAME,
    GET_VERB_DESCRIPTOR,
    GET_CLASS_NAME,
    GET_CLASS_DOCS,
    REQUEST_RESET,
];

impl CoreVerb {
    fn options(&self) -> CallOptions {
        if self.expects_response {
            CallOptions::default()
        } else {
            CallOptions::no_response()
        }
    }

    pub fn binding(&self) -> std::result::Result<RpcBinding, FormatError> {
        let names = |names: &[&str]| Some(names.iter().map(|n| n.to_string()).collect());
        let binding = RpcBinding::new(
            CORE_CLASS_NUMBER,
            self.number,
            self.name,
            self.in_format,
            self.out_format,
        )?;
        Ok(binding
            .with_doc(self.doc)
            .with_param_names(names(self.in_param_names), names(self.out_param_names))
            .with_defaults(self.options()))
    }
}

/// Bindings for every core verb.
pub fn core_bindings() -> std::result::Result<Vec<RpcBinding>, FormatError> {
    CORE_VERBS.iter().map(CoreVerb::binding).collect()
}

/// Typed access to the core API over a session.
pub struct CoreApi<'s, T> {
    session: &'s mut Session<T>,
}

impl<'s, T: Transport> CoreApi<'s, T> {
    pub fn new(session: &'s mut Session<T>) -> Self {
        Self { session }
    }

    fn call(&mut self, verb: &CoreVerb, args: &[Value]) -> Result<Reply> {
        let rpc = format!("{CORE_CLASS_NAME}.{}", verb.name);
        self.session.execute_named(
            CORE_CLASS_NUMBER,
            verb.number,
            verb.in_format,
            verb.out_format,
            args,
            &verb.options(),
            &rpc,
        )
    }

    pub fn read_board_id(&mut self) -> Result<u32> {
        let reply = self.call(&READ_BOARD_ID, &[])?;
        single_u32(&READ_BOARD_ID, reply)
    }

    pub fn read_version_string(&mut self) -> Result<String> {
        let reply = self.call(&READ_VERSION_STRING, &[])?;
        single_string(&READ_VERSION_STRING, reply)
    }

    pub fn read_part_id(&mut self) -> Result<[u32; 2]> {
        let reply = self.call(&READ_PART_ID, &[])?;
        u32_array(&READ_PART_ID, reply)
    }

    pub fn read_serial_number(&mut self) -> Result<[u32; 4]> {
        let reply = self.call(&READ_SERIAL_NUMBER, &[])?;
        u32_array(&READ_SERIAL_NUMBER, reply)
    }

    pub fn get_available_classes(&mut self) -> Result<Vec<u32>> {
        let reply = self.call(&GET_AVAILABLE_CLASSES, &[])?;
        u32_list(&GET_AVAILABLE_CLASSES, reply)
    }

    pub fn get_available_verbs(&mut self, class: u32) -> Result<Vec<u32>> {
        let reply = self.call(&GET_AVAILABLE_VERBS, &[class.into()])?;
        u32_list(&GET_AVAILABLE_VERBS, reply)
    }

    pub fn get_verb_name(&mut self, class: u32, verb: u32) -> Result<String> {
        let reply = self.call(&GET_VERB_NAME, &[class.into(), verb.into()])?;
        single_string(&GET_VERB_NAME, reply)
    }

    pub fn get_verb_descriptor(
        &mut self,
        class: u32,
        verb: u32,
        descriptor: DescriptorKind,
    ) -> Result<String> {
        let args: [Value; 3] = [class.into(), verb.into(), (descriptor as u8).into()];
        let reply = self.call(&GET_VERB_DESCRIPTOR, &args)?;
        single_string(&GET_VERB_DESCRIPTOR, reply)
    }

    pub fn get_class_name(&mut self, class: u32) -> Result<String> {
        let reply = self.call(&GET_CLASS_NAME, &[class.into()])?;
        single_string(&GET_CLASS_NAME, reply)
    }

    pub fn get_class_docs(&mut self, class: u32) -> Result<String> {
        let reply = self.call(&GET_CLASS_DOCS, &[class.into()])?;
        single_string(&GET_CLASS_DOCS, reply)
    }

    /// Ask the board to reset. No response is read.
    pub fn request_reset(&mut self, reset_type: u32) -> Result<()> {
        self.call(&REQUEST_RESET, &[reset_type.into()])?;
        Ok(())
    }
}

fn shape_error(verb: &CoreVerb, expected: &'static str, actual: &'static str) -> RpcError {
    RpcError::format(
        &format!("{CORE_CLASS_NAME}.{}", verb.name),
        FormatError::TypeMismatch {
            format: verb.out_format.to_string(),
            field: 0,
            expected,
            actual,
        },
    )
}

fn single_u32(verb: &CoreVerb, reply: Reply) -> Result<u32> {
    match reply {
        Reply::Single(value) => value
            .as_u32()
            .ok_or_else(|| shape_error(verb, "a uint32", value.kind())),
        Reply::Multiple(_) => Err(shape_error(verb, "a uint32", "list")),
    }
}

fn single_string(verb: &CoreVerb, reply: Reply) -> Result<String> {
    match reply {
        Reply::Single(Value::Str(s)) => Ok(s),
        Reply::Single(other) => Err(shape_error(verb, "a string", other.kind())),
        Reply::Multiple(_) => Err(shape_error(verb, "a string", "list")),
    }
}

fn u32_list(verb: &CoreVerb, reply: Reply) -> Result<Vec<u32>> {
    reply
        .into_values()
        .iter()
        .map(|value| {
            value
                .as_u32()
                .ok_or_else(|| shape_error(verb, "a uint32", value.kind()))
        })
        .collect()
}

fn u32_array<const N: usize>(verb: &CoreVerb, reply: Reply) -> Result<[u32; N]> {
    let values = u32_list(verb, reply)?;
    <[u32; N]>::try_from(values).map_err(|_| shape_error(verb, "a fixed-size array", "list"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_verbs_have_valid_formats() {
        let bindings = core_bindings().unwrap();
        assert_eq!(bindings.len(), CORE_VERBS.len());
        assert!(bindings.iter().all(|b| b.class_number == CORE_CLASS_NUMBER));
    }

    #[test]
    fn core_signatures() {
        let part_id = READ_PART_ID.binding().unwrap();
        assert_eq!(
            part_id.signature(),
            "read_part_id() -> part_id: uint32, uint32"
        );

        let descriptor = GET_VERB_DESCRIPTOR.binding().unwrap();
        assert_eq!(
            descriptor.signature(),
            "get_verb_descriptor(class_number: uint32, verb_number: uint32, descriptor_number: uint8) -> descriptor: string"
        );
    }

    #[test]
    fn reset_reads_no_response() {
        let reset = REQUEST_RESET.binding().unwrap();
        assert_eq!(reset.defaults.max_response_length, Some(0));
        assert_eq!(reset.verb_number, 0x20);
        assert!(reset.out_format.is_empty());
    }

    #[test]
    fn descriptor_selectors_match_firmware() {
        assert_eq!(DescriptorKind::OutSignature as u8, 0);
        assert_eq!(DescriptorKind::InSignature as u8, 1);
        assert_eq!(DescriptorKind::Doc as u8, 2);
        assert_eq!(DescriptorKind::OutParamNames as u8, 3);
        assert_eq!(DescriptorKind::InParamNames as u8, 4);
    }
}
