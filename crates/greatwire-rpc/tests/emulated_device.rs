//! Sessions, discovery and bindings against an emulated libgreat board.

use std::time::Duration;

use greatwire_format::{Reply, Value};
use greatwire_rpc::{
    discover, CallOptions, CoreApi, DiscoveryConfig, RpcError, Session, SessionConfig,
    UNDOCUMENTED,
};
use greatwire_transport::{CommandHandler, Loopback, Operation, TransportError};

const EINVAL: u32 = 22;
const ENOSYS: u32 = 88;

struct Verb {
    number: u32,
    name: &'static str,
    in_sig: &'static str,
    out_sig: &'static str,
    doc: &'static str,
    in_names: &'static str,
    out_names: &'static str,
}

struct Class {
    number: u32,
    name: &'static str,
    docs: Option<&'static str>,
    verbs: Vec<Verb>,
}

/// A board exposing the core introspection verbs and an LED class.
struct Board {
    classes: Vec<Class>,
    leds: [bool; 4],
    resets: Vec<u32>,
}

impl Board {
    fn new() -> Self {
        let classes = vec![
            Class {
                number: 0,
                name: "core",
                docs: Some("Core API."),
                verbs: vec![Verb {
                    number: 0,
                    name: "read_board_id",
                    in_sig: "",
                    out_sig: "<I",
                    doc: "Fetches the board's type identifier.",
                    in_names: "",
                    out_names: "id",
                }],
            },
            Class {
                number: 0x10,
                name: "leds",
                docs: Some("Controls the board's LEDs."),
                verbs: vec![
                    Verb {
                        number: 0,
                        name: "toggle",
                        in_sig: "<B",
                        out_sig: "",
                        doc: "Toggles an LED.",
                        in_names: "led_number",
                        out_names: "",
                    },
                    Verb {
                        number: 1,
                        name: "",
                        in_sig: "<*B",
                        out_sig: "<*B",
                        doc: "*",
                        in_names: "*",
                        out_names: "*",
                    },
                    Verb {
                        number: 2,
                        name: "program",
                        in_sig: "*",
                        out_sig: "<I",
                        doc: "Loads a light show.",
                        in_names: "*",
                        out_names: "*",
                    },
                ],
            },
            Class {
                number: 0x11,
                name: "secret",
                docs: None,
                verbs: Vec::new(),
            },
            Class {
                number: 0x12,
                name: "garbled",
                docs: Some("Describes itself badly."),
                verbs: vec![Verb {
                    number: 0,
                    name: "read",
                    in_sig: "<(B",
                    out_sig: "",
                    doc: "",
                    in_names: "",
                    out_names: "",
                }],
            },
        ];
        Self {
            classes,
            leds: [false; 4],
            resets: Vec::new(),
        }
    }

    fn class(&self, number: u32) -> Result<&Class, u32> {
        self.classes
            .iter()
            .find(|class| class.number == number)
            .ok_or(EINVAL)
    }

    fn verb(&self, class: u32, number: u32) -> Result<&Verb, u32> {
        self.class(class)?
            .verbs
            .iter()
            .find(|verb| verb.number == number)
            .ok_or(EINVAL)
    }

    fn core(&mut self, verb: u32, payload: &[u8]) -> Result<Vec<u8>, u32> {
        match verb {
            0 => Ok(2u32.to_le_bytes().to_vec()),
            1 => Ok(cstr("v2024.0.1")),
            2 => Ok(words(&[0xa000_0a30, 0x0000_0000])),
            3 => Ok(words(&[1, 2, 3, 4])),
            4 => {
                let numbers: Vec<u32> = self.classes.iter().map(|c| c.number).collect();
                Ok(words(&numbers))
            }
            5 => {
                let class = self.class(word(payload, 0))?;
                let numbers: Vec<u32> = class.verbs.iter().map(|v| v.number).collect();
                Ok(words(&numbers))
            }
            6 => Ok(cstr(self.verb(word(payload, 0), word(payload, 1))?.name)),
            7 => {
                let verb = self.verb(word(payload, 0), word(payload, 1))?;
                let text = match payload.get(8) {
                    Some(0) => verb.out_sig,
                    Some(1) => verb.in_sig,
                    Some(2) => verb.doc,
                    Some(3) => verb.out_names,
                    Some(4) => verb.in_names,
                    _ => return Err(EINVAL),
                };
                Ok(cstr(text))
            }
            8 => Ok(cstr(self.class(word(payload, 0))?.name)),
            9 => self.class(word(payload, 0))?.docs.map(cstr).ok_or(EINVAL),
            0x20 => {
                self.resets.push(word(payload, 0));
                Ok(Vec::new())
            }
            _ => Err(ENOSYS),
        }
    }
}

impl CommandHandler for Board {
    fn handle(&mut self, class: u32, verb: u32, payload: &[u8]) -> Result<Vec<u8>, u32> {
        match (class, verb) {
            (0, verb) => self.core(verb, payload),
            (0x10, 0) => {
                let led = payload.first().copied().ok_or(EINVAL)? as usize;
                let state = self.leds.get_mut(led).ok_or(EINVAL)?;
                *state = !*state;
                Ok(Vec::new())
            }
            (0x10, 1) => Ok(payload.to_vec()),
            _ => Err(ENOSYS),
        }
    }
}

fn cstr(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    bytes
}

fn words(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn word(payload: &[u8], index: usize) -> u32 {
    let start = index * 4;
    payload
        .get(start..start + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .unwrap_or(u32::MAX)
}

fn session() -> Session<Loopback<Board>> {
    let config = SessionConfig {
        cancel_retry_delay: Some(Duration::from_millis(1)),
        ..SessionConfig::default()
    };
    Session::with_config(Loopback::new(Board::new()), config)
}

#[test]
fn core_api_reads_board_identity() {
    let mut session = session();
    let mut core = CoreApi::new(&mut session);
    assert_eq!(core.read_board_id().unwrap(), 2);
    assert_eq!(core.read_version_string().unwrap(), "v2024.0.1");
    assert_eq!(core.read_part_id().unwrap(), [0xa000_0a30, 0]);
    assert_eq!(core.read_serial_number().unwrap(), [1, 2, 3, 4]);
    let classes = core.get_available_classes().unwrap();
    assert_eq!(classes, vec![0, 0x10, 0x11, 0x12]);
    assert_eq!(core.get_class_name(0x10).unwrap(), "leds");
}

#[test]
fn request_reset_reads_no_response() {
    let mut session = session();
    CoreApi::new(&mut session).request_reset(1).unwrap();
    assert_eq!(session.transport().handler().resets, vec![1]);
    assert_eq!(session.transport().stats().reads, 0);
}

#[test]
fn discovery_builds_bindings_and_skips_broken_classes() {
    let mut session = session();
    let api = discover(&mut session, &DiscoveryConfig::default()).unwrap();

    let names: Vec<_> = api.classes().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["core", "leds"]);

    // The static core class is kept rather than replaced.
    assert_eq!(api.class("core").unwrap().verbs.len(), 11);

    let leds = api.class("leds").unwrap();
    assert_eq!(leds.number, 0x10);
    assert_eq!(leds.docs, "Controls the board's LEDs.");
    assert_eq!(leds.opaque_verbs, vec![2]);

    let toggle = api.binding("leds", "toggle").unwrap();
    assert_eq!(toggle.signature(), "toggle(led_number: uint8)");
    assert_eq!(toggle.doc, "Toggles an LED.");

    let unnamed = api.binding("leds", "verb_1").unwrap();
    assert_eq!(unnamed.doc, UNDOCUMENTED);
    assert_eq!(unnamed.in_param_names, None);
    assert_eq!(unnamed.signature(), "verb_1(*arg1: uint8[]) -> *uint8[]");

    assert!(matches!(
        api.binding("leds", "program"),
        Err(RpcError::UnknownVerb { .. })
    ));
    assert!(matches!(
        api.class("secret"),
        Err(RpcError::UnknownClass(_))
    ));
}

#[test]
fn discovery_can_overwrite_known_classes() {
    let mut session = session();
    let config = DiscoveryConfig { overwrite: true };
    let api = discover(&mut session, &config).unwrap();
    let core = api.class("core").unwrap();
    assert_eq!(core.verbs.len(), 1);
    assert_eq!(core.docs, "Core API.");
}

#[test]
fn discovery_requires_class_listing() {
    let handler =
        |_class: u32, _verb: u32, _payload: &[u8]| -> Result<Vec<u8>, u32> { Err(ENOSYS) };
    let mut session = Session::new(Loopback::new(handler));
    let err = discover(&mut session, &DiscoveryConfig::default()).unwrap_err();
    let RpcError::Discovery { stage, .. } = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(*stage, "listing classes");
    assert_eq!(err.device_code(), Some(ENOSYS));
}

#[test]
fn discovery_aborts_on_link_failure() {
    let mut session = session();
    session
        .transport_mut()
        .inject(Operation::Read, TransportError::Disconnected);
    let err = discover(&mut session, &DiscoveryConfig::default()).unwrap_err();
    match err {
        RpcError::Discovery { source, .. } => {
            assert!(matches!(
                *source,
                RpcError::Transport(TransportError::Disconnected)
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn discovered_bindings_invoke_verbs() {
    let mut session = session();
    let api = discover(&mut session, &DiscoveryConfig::default()).unwrap();

    let toggle = api.binding("leds", "toggle").unwrap();
    let reply = toggle.invoke(&mut session, &[Value::UInt(2)]).unwrap();
    assert!(reply.is_empty());
    assert_eq!(
        session.transport().handler().leds,
        [false, false, true, false]
    );

    let echo = api.binding("leds", "verb_1").unwrap();
    let args = [Value::UInt(7), Value::UInt(8), Value::UInt(9)];
    assert_eq!(
        echo.invoke(&mut session, &args).unwrap(),
        Reply::Multiple(args.to_vec())
    );
}

#[test]
fn device_errors_carry_errno_and_session_recovers() {
    let mut session = session();
    let api = discover(&mut session, &DiscoveryConfig::default()).unwrap();
    let toggle = api.binding("leds", "toggle").unwrap();

    let err = toggle.invoke(&mut session, &[Value::UInt(9)]).unwrap_err();
    match &err {
        RpcError::CommandFailed { code, name, rpc, class, .. } => {
            assert_eq!(*code, EINVAL);
            assert_eq!(*name, Some("EINVAL"));
            assert_eq!(rpc, "toggle");
            assert_eq!(*class, 0x10);
        }
        other => panic!("unexpected error: {other}"),
    }

    toggle.invoke(&mut session, &[Value::UInt(0)]).unwrap();
    assert!(session.transport().handler().leds[0]);
}

#[test]
fn repeat_memo_is_dropped_after_abort() {
    let mut session = session();
    let api = discover(&mut session, &DiscoveryConfig::default()).unwrap();
    let echo = api.binding("leds", "verb_1").unwrap();
    let toggle = api.binding("leds", "toggle").unwrap();
    session.transport_mut().reset_stats();

    let args = [Value::UInt(1)];
    echo.invoke(&mut session, &args).unwrap();
    echo.invoke(&mut session, &args).unwrap();
    assert_eq!(session.transport().stats().repeats, 1);

    toggle.invoke(&mut session, &[Value::UInt(7)]).unwrap_err();
    assert!(!session.has_repeat_memo());

    echo.invoke(&mut session, &args).unwrap();
    let stats = session.transport().stats();
    assert_eq!(stats.writes, 3);
    assert_eq!(stats.repeats, 1);
    assert_eq!(stats.cancels, 1);
}

#[test]
fn sessions_can_borrow_a_transport() {
    let mut loopback = Loopback::new(Board::new());
    {
        let mut session = Session::new(&mut loopback);
        let id = CoreApi::new(&mut session).read_board_id().unwrap();
        assert_eq!(id, 2);
    }
    assert_eq!(loopback.stats().executions, 1);
}

#[test]
fn raw_commands_bypass_formats() {
    let mut session = session();
    let response = session
        .send_and_receive(0x10, 1, &[4, 5, 6], &CallOptions::default())
        .unwrap();
    assert_eq!(response.as_ref(), &[4, 5, 6]);

    let args = [Value::UInt(0x10), Value::UInt(0)];
    let reply = session
        .execute_command(0, 6, "<II", "<S", &args, &CallOptions::default())
        .unwrap();
    assert_eq!(reply, Reply::Single(Value::Str("toggle".to_string())));
}
