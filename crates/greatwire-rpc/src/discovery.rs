//! API discovery through the core introspection verbs.
//!
//! Discovery lists the device's classes, then for each class fetches its
//! name, documentation and verbs, and for each verb its name, signatures,
//! documentation and parameter names. Every verb whose signatures can be
//! expressed becomes an [`RpcBinding`].

use std::collections::BTreeMap;

use greatwire_format::FormatError;
use greatwire_transport::Transport;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::binding::{parse_param_names, RpcBinding};
use crate::config::DiscoveryConfig;
use crate::core_api::{
    core_bindings, CoreApi, DescriptorKind, CORE_CLASS_DOCS, CORE_CLASS_NAME, CORE_CLASS_NUMBER,
};
use crate::error::{Result, RpcError};
use crate::session::Session;

/// Signature or name string a device returns when it cannot describe a verb.
pub const UNDESCRIBED: &str = "*";

/// Documentation used for verbs the firmware leaves undocumented.
pub const UNDOCUMENTED: &str = "{undocumented on firmware side}";

/// Raw introspection results for one verb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerbDescriptor {
    pub number: u32,
    pub name: String,
    pub in_signature: String,
    pub out_signature: String,
    pub doc: String,
    pub in_param_names: Option<Vec<String>>,
    pub out_param_names: Option<Vec<String>>,
}

impl VerbDescriptor {
    /// Whether the device could describe both signatures.
    pub fn is_describable(&self) -> bool {
        self.in_signature != UNDESCRIBED && self.out_signature != UNDESCRIBED
    }

    /// Build a binding for this verb of `class`.
    ///
    /// Returns `Ok(None)` for verbs whose signatures are too complex for the
    /// device to describe; those can only be called by number.
    pub fn to_binding(&self, class: u32) -> std::result::Result<Option<RpcBinding>, FormatError> {
        if !self.is_describable() {
            return Ok(None);
        }
        let binding = RpcBinding::new(
            class,
            self.number,
            self.name.clone(),
            &self.in_signature,
            &self.out_signature,
        )?
        .with_doc(self.doc.clone())
        .with_param_names(self.in_param_names.clone(), self.out_param_names.clone());
        Ok(Some(binding))
    }
}

/// A class of the device's API and its callable verbs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDescriptor {
    pub number: u32,
    pub name: String,
    pub docs: String,
    pub verbs: Vec<RpcBinding>,
    /// Verbs the device could not describe.
    pub opaque_verbs: Vec<u32>,
}

impl ClassDescriptor {
    /// Look up a verb by name.
    pub fn verb(&self, name: &str) -> Option<&RpcBinding> {
        self.verbs.iter().find(|binding| binding.name == name)
    }
}

/// Every known class, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ApiCollection {
    classes: BTreeMap<String, ClassDescriptor>,
}

impl ApiCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// A collection holding only the statically known core class.
    pub fn with_core() -> std::result::Result<Self, FormatError> {
        let mut api = Self::new();
        api.insert(ClassDescriptor {
            number: CORE_CLASS_NUMBER,
            name: CORE_CLASS_NAME.to_string(),
            docs: CORE_CLASS_DOCS.to_string(),
            verbs: core_bindings()?,
            opaque_verbs: Vec::new(),
        });
        Ok(api)
    }

    /// Add a class, replacing any class of the same name.
    pub fn insert(&mut self, class: ClassDescriptor) -> Option<ClassDescriptor> {
        self.classes.insert(class.name.clone(), class)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn class(&self, name: &str) -> Result<&ClassDescriptor> {
        self.classes
            .get(name)
            .ok_or_else(|| RpcError::UnknownClass(name.to_string()))
    }

    /// Look up a verb binding by class and verb name.
    pub fn binding(&self, class: &str, verb: &str) -> Result<&RpcBinding> {
        self.class(class)?
            .verb(verb)
            .ok_or_else(|| RpcError::UnknownVerb {
                class: class.to_string(),
                verb: verb.to_string(),
            })
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Discover the device's API, starting from the static core class.
///
/// Failing to list classes is fatal: without a working core API no device
/// is usable. A class whose introspection the device rejects, or describes
/// with malformed signatures, is logged and skipped. Link failures abort
/// discovery.
pub fn discover<T: Transport>(
    session: &mut Session<T>,
    config: &DiscoveryConfig,
) -> Result<ApiCollection> {
    let mut api = ApiCollection::with_core().map_err(|e| RpcError::format(CORE_CLASS_NAME, e))?;

    let class_numbers = CoreApi::new(session)
        .get_available_classes()
        .map_err(|e| RpcError::Discovery {
            stage: "listing classes",
            source: Box::new(e),
        })?;
    debug!(classes = ?class_numbers, "device classes");

    for class in class_numbers {
        match discover_class(session, class, &api, config) {
            Ok(Some(descriptor)) => {
                debug!(
                    class,
                    name = %descriptor.name,
                    verbs = descriptor.verbs.len(),
                    "discovered class"
                );
                api.insert(descriptor);
            }
            Ok(None) => {}
            Err(err @ (RpcError::CommandFailed { .. } | RpcError::Format { .. })) => {
                warn!(class, %err, "skipping class");
            }
            Err(err) => return Err(err),
        }
    }

    info!(classes = api.len(), "discovery complete");
    Ok(api)
}

fn discover_class<T: Transport>(
    session: &mut Session<T>,
    class: u32,
    known: &ApiCollection,
    config: &DiscoveryConfig,
) -> Result<Option<ClassDescriptor>> {
    let mut core = CoreApi::new(session);

    let name = core.get_class_name(class)?;
    if known.contains(&name) && !config.overwrite {
        debug!(class, %name, "class already known, skipping");
        return Ok(None);
    }
    let docs = core.get_class_docs(class)?;

    let mut descriptor = ClassDescriptor {
        number: class,
        name,
        docs,
        verbs: Vec::new(),
        opaque_verbs: Vec::new(),
    };

    for verb in core.get_available_verbs(class)? {
        let verb = describe_verb(&mut core, class, verb)?;
        let rpc = format!("{}.{}", descriptor.name, verb.name);
        let binding = verb
            .to_binding(class)
            .map_err(|e| RpcError::format(&rpc, e))?;
        match binding {
            Some(binding) => descriptor.verbs.push(binding),
            None => {
                debug!(class, verb = verb.number, name = %verb.name, "verb not describable");
                descriptor.opaque_verbs.push(verb.number);
            }
        }
    }

    Ok(Some(descriptor))
}

/// Fetch everything the device knows about one verb.
pub fn describe_verb<T: Transport>(
    core: &mut CoreApi<'_, T>,
    class: u32,
    verb: u32,
) -> Result<VerbDescriptor> {
    let mut name = core.get_verb_name(class, verb)?;
    if name.is_empty() {
        name = format!("verb_{verb}");
    }
    let in_signature = core.get_verb_descriptor(class, verb, DescriptorKind::InSignature)?;
    let out_signature = core.get_verb_descriptor(class, verb, DescriptorKind::OutSignature)?;

    let mut doc = core.get_verb_descriptor(class, verb, DescriptorKind::Doc)?;
    if doc == UNDESCRIBED {
        doc = UNDOCUMENTED.to_string();
    }

    let in_names = core.get_verb_descriptor(class, verb, DescriptorKind::InParamNames)?;
    let out_names = core.get_verb_descriptor(class, verb, DescriptorKind::OutParamNames)?;

    Ok(VerbDescriptor {
        number: verb,
        name,
        in_signature,
        out_signature,
        doc,
        in_param_names: parse_param_names(&in_names),
        out_param_names: parse_param_names(&out_names),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verb(in_signature: &str, out_signature: &str) -> VerbDescriptor {
        VerbDescriptor {
            number: 3,
            name: "toggle".to_string(),
            in_signature: in_signature.to_string(),
            out_signature: out_signature.to_string(),
            doc: UNDOCUMENTED.to_string(),
            in_param_names: None,
            out_param_names: None,
        }
    }

    #[test]
    fn undescribable_verbs_get_no_binding() {
        assert_eq!(verb("*", "<I").to_binding(1).unwrap(), None);
        assert_eq!(verb("<I", "*").to_binding(1).unwrap(), None);
        let binding = verb("<B", "").to_binding(1).unwrap().unwrap();
        assert_eq!(binding.class_number, 1);
        assert_eq!(binding.verb_number, 3);
    }

    #[test]
    fn malformed_signatures_are_errors() {
        assert!(verb("<(B", "").to_binding(1).is_err());
    }

    #[test]
    fn collection_lookup() {
        let api = ApiCollection::with_core().unwrap();
        assert!(api.contains("core"));
        assert_eq!(api.binding("core", "read_board_id").unwrap().verb_number, 0);
        assert!(matches!(api.class("leds"), Err(RpcError::UnknownClass(_))));
        assert!(matches!(
            api.binding("core", "frobnicate"),
            Err(RpcError::UnknownVerb { .. })
        ));
    }
}
