pub mod backend;
pub mod bridge;
pub mod config;
pub mod dialer;
pub mod hook;
pub mod lines;
pub mod ringer;
pub mod segment;
pub mod state;

pub use state::{ListenerId, StateStore};

/// Name of the shared memory segment. Every process attaching to the
/// state vector must use this exact name.
pub const SEGMENT_NAME: &str = "ringring";

/// Default directory holding the segment file (the POSIX shm mount, which
/// is where `SharedMemory(name="ringring")` attachments end up as well).
pub const DEFAULT_SHM_DIR: &str = "/dev/shm";

// ============================================
// State Fields
// ============================================

/// A named boolean state field.
///
/// Each field has exactly one writing side: device-owned fields are written
/// only by workers inside the device-control process, externally-owned
/// fields only by processes attaching to the shared segment (the web API).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    RegisteredWithSip,
    OnTheHook,
    CallActive,
    Ringing,
    Busy,
}

/// Fixed field order of the shared segment: one byte per field, in this
/// order, each byte `0x00` or `0x01`.
pub const FIELD_ORDER: [Field; 5] = [
    Field::RegisteredWithSip,
    Field::OnTheHook,
    Field::CallActive,
    Field::Ringing,
    Field::Busy,
];

/// Size of the shared segment in bytes.
pub const FIELD_COUNT: usize = FIELD_ORDER.len();

impl Field {
    /// Field name as exposed to external processes.
    pub fn name(self) -> &'static str {
        match self {
            Field::RegisteredWithSip => "registeredWithSip",
            Field::OnTheHook => "onTheHook",
            Field::CallActive => "callActive",
            Field::Ringing => "ringing",
            Field::Busy => "busy",
        }
    }

    /// True if the sole writer of this field is a process outside the
    /// device-control core. The bridge only pulls these fields inward.
    pub fn is_externally_owned(self) -> bool {
        matches!(self, Field::Busy)
    }
}

/// Encode a field vector into the shared segment byte layout.
pub fn encode_fields(values: &[bool; FIELD_COUNT]) -> [u8; FIELD_COUNT] {
    let mut bytes = [0u8; FIELD_COUNT];
    for (byte, value) in bytes.iter_mut().zip(values) {
        *byte = u8::from(*value);
    }
    bytes
}

/// Decode raw segment bytes into a field vector. Any read of unexpected
/// length decodes to `None` and is treated as "no external change" by the
/// bridge. Nonzero bytes decode as `true`.
pub fn decode_fields(bytes: &[u8]) -> Option<[bool; FIELD_COUNT]> {
    if bytes.len() != FIELD_COUNT {
        return None;
    }
    let mut values = [false; FIELD_COUNT];
    for (value, byte) in values.iter_mut().zip(bytes) {
        *value = *byte != 0;
    }
    Some(values)
}
