//! Bluetooth UUIDs for the RoomStatusMonitor peripheral.
//!
//! The peripheral exposes one custom GATT service with three characteristics.

use uuid::{Uuid, uuid};

/// Name the peripheral advertises under.
pub const DEVICE_NAME: &str = "RoomStatusMonitor";

/// Custom GATT service UUID.
pub const ROOM_STATUS_SERVICE: Uuid = uuid!("d3e6a1bb-2f35-4853-9f02-ba02b91044f1");

/// Status characteristic (read, write, notify).
pub const STATUS: Uuid = uuid!("e9229875-87d4-4b24-b703-361649ad9ad6");

/// Content characteristic (read, write). Responses are written here.
pub const CONTENT: Uuid = uuid!("c310ce58-d663-4dcd-9e37-8a5431f6550d");

/// Call-signal characteristic (notify only).
pub const CALL_SIGNAL: Uuid = uuid!("5a8e96e4-f950-4512-9a50-1008c6629d43");
