//! Error numbers reported by libgreat firmware.
//!
//! Firmware is built against newlib, so codes follow newlib's `errno.h`
//! numbering rather than the host's.

const ERRNO_NAMES: &[(u32, &str)] = &[
    (1, "EPERM"),
    (2, "ENOENT"),
    (3, "ESRCH"),
    (4, "EINTR"),
    (5, "EIO"),
    (6, "ENXIO"),
    (7, "E2BIG"),
    (9, "EBADF"),
    (11, "EAGAIN"),
    (12, "ENOMEM"),
    (13, "EACCES"),
    (14, "EFAULT"),
    (16, "EBUSY"),
    (17, "EEXIST"),
    (19, "ENODEV"),
    (22, "EINVAL"),
    (28, "ENOSPC"),
    (34, "ERANGE"),
    (61, "ENODATA"),
    (71, "EPROTO"),
    (77, "EBADMSG"),
    (88, "ENOSYS"),
    (116, "ETIMEDOUT"),
    (122, "EMSGSIZE"),
    (134, "ENOTSUP"),
    (139, "EOVERFLOW"),
];

/// Symbolic name of a device error number, if known.
pub fn errno_name(code: u32) -> Option<&'static str> {
    ERRNO_NAMES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, name)| *name)
}

/// Error number for a symbolic name, if known.
pub fn errno_code(name: &str) -> Option<u32> {
    ERRNO_NAMES
        .iter()
        .find(|(_, known)| known.eq_ignore_ascii_case(name))
        .map(|(code, _)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes() {
        assert_eq!(errno_name(22), Some("EINVAL"));
        assert_eq!(errno_name(88), Some("ENOSYS"));
        assert_eq!(errno_name(134), Some("ENOTSUP"));
        assert_eq!(errno_name(0), None);
        assert_eq!(errno_name(9999), None);
    }

    #[test]
    fn names_resolve_back() {
        assert_eq!(errno_code("ebusy"), Some(16));
        assert_eq!(errno_code("EWHATEVER"), None);
        for (code, name) in ERRNO_NAMES {
            assert_eq!(errno_code(name), Some(*code));
        }
    }
}
