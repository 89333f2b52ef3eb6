//! Connection-scoped key/value properties.
//!
//! Every connection owns a small property bag other connections can read.
//! Writes to a foreign connection are subject to server policy and normally
//! come back as [`crate::Error::PermissionDenied`].

#[cfg(target_os = "macos")]
use std::{ffi::c_int, ptr};

#[cfg(target_os = "macos")]
use core_foundation::{
    base::{CFTypeRef, TCFType},
    string::{CFString, CFStringRef},
};
#[cfg(target_os = "macos")]
use core_graphics::base::CGError;
#[cfg(target_os = "macos")]
use tracing::trace;

#[cfg(target_os = "macos")]
use crate::{
    cfutil,
    connection::ConnectionId,
    error::{Error, Result},
};

#[cfg(target_os = "macos")]
#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGSCopyConnectionProperty(
        cid: c_int,
        target_cid: c_int,
        key: CFStringRef,
        out_value: *mut CFTypeRef,
    ) -> CGError;
    fn CGSSetConnectionProperty(
        cid: c_int,
        target_cid: c_int,
        key: CFStringRef,
        value: CFTypeRef,
    ) -> CGError;
}

/// Value of a connection property.
///
/// The server stores plain CF values; anything outside this set is treated
/// as absent rather than surfaced raw.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    /// CFBoolean.
    Bool(bool),
    /// Integer-typed CFNumber.
    Int(i64),
    /// Float-typed CFNumber.
    Float(f64),
    /// CFString, decoded to UTF-8.
    String(String),
    /// Raw CFData payload.
    Data(Vec<u8>),
}

/// Read a property of `target` by key.
///
/// A missing key, a value of an unmodeled CF type, or a stale target all
/// come back as [`crate::Error::NotFound`].
#[cfg(target_os = "macos")]
pub fn connection_property(
    conn: ConnectionId,
    target: ConnectionId,
    key: &str,
) -> Result<PropertyValue> {
    let cf_key = CFString::new(key);
    let mut value: CFTypeRef = ptr::null();
    // SAFETY: the key outlives the call; the out pointer is valid for one
    // write and ownership of the result follows the copy rule.
    let err = unsafe {
        CGSCopyConnectionProperty(
            conn.raw(),
            target.raw(),
            cf_key.as_concrete_TypeRef(),
            &mut value,
        )
    };
    if err != 0 {
        return Err(Error::from_cg(err));
    }
    cfutil::value_from_cftype(value).ok_or(Error::NotFound)
}

/// Write a property on `target`.
///
/// Writing to one's own connection always succeeds for the modeled value
/// types; the server decides whether foreign writes are allowed.
#[cfg(target_os = "macos")]
pub fn set_connection_property(
    conn: ConnectionId,
    target: ConnectionId,
    key: &str,
    value: &PropertyValue,
) -> Result<()> {
    let cf_key = CFString::new(key);
    let cf_value = cfutil::value_to_cftype(value);
    // SAFETY: both CF values outlive the call; the server copies what it
    // keeps.
    let err = unsafe {
        CGSSetConnectionProperty(
            conn.raw(),
            target.raw(),
            cf_key.as_concrete_TypeRef(),
            cf_value.as_CFTypeRef(),
        )
    };
    if err != 0 {
        return Err(Error::from_cg(err));
    }
    trace!("set_connection_property {target} key={key}");
    Ok(())
}
