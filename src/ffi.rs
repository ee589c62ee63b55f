//! C ABI boundary.
//!
//! A foreign caller hands over a JSON tree document and receives an owned
//! encoded buffer it can read without further calls into Rust. The buffer
//! stays valid until it is passed back to [`syntax_buffer_free`].
//!
//! ```text
//! caller                          syntax_buffer
//!   │  syntax_buffer_encode_json(json, &ptr, &len)
//!   │ ──────────────────────────────────────────►  parse, encode
//!   │ ◄──────────────────────────────────────────  FfiStatus, ptr, len
//!   │  read ptr[0..len]
//!   │  syntax_buffer_free(ptr, len)
//!   │ ──────────────────────────────────────────►  drop
//! ```

use std::ffi::{CStr, c_char};
use std::ptr;

use crate::config::EncoderConfig;
use crate::encoder::encode_document;
use crate::error::EncodeError;
use crate::tree::TreeDocument;

/// Result type for FFI operations.
pub type FfiResult<T> = Result<T, FfiError>;

/// Errors that can occur at the FFI boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FfiError {
    /// The input document could not be deserialized.
    DeserializationError(String),
    /// Invalid UTF-8 string.
    Utf8Error(String),
    /// Null pointer encountered.
    NullPointer,
    /// The document could not be encoded.
    Encode(EncodeError),
}

impl std::fmt::Display for FfiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FfiError::DeserializationError(msg) => write!(f, "deserialization error: {}", msg),
            FfiError::Utf8Error(msg) => write!(f, "UTF-8 error: {}", msg),
            FfiError::NullPointer => write!(f, "null pointer"),
            FfiError::Encode(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for FfiError {}

impl From<EncodeError> for FfiError {
    fn from(err: EncodeError) -> Self {
        FfiError::Encode(err)
    }
}

/// Status codes for FFI function returns.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiStatus {
    /// Operation succeeded.
    Ok = 0,
    /// Generic error.
    Error = -1,
    /// The input document is not valid JSON for a tree.
    DeserializationError = -2,
    /// The tree breaks an input invariant (range, kind, config).
    InvalidInput = -3,
    /// The tree does not fit a fixed-width field.
    CapacityExceeded = -4,
    /// Null pointer.
    NullPointer = -5,
}

impl From<&FfiError> for FfiStatus {
    fn from(err: &FfiError) -> Self {
        match err {
            FfiError::DeserializationError(_) => FfiStatus::DeserializationError,
            FfiError::NullPointer => FfiStatus::NullPointer,
            FfiError::Utf8Error(_) => FfiStatus::InvalidInput,
            FfiError::Encode(EncodeError::CapacityExceeded { .. }) => FfiStatus::CapacityExceeded,
            FfiError::Encode(EncodeError::ReservedKind)
            | FfiError::Encode(EncodeError::InvalidRange { .. })
            | FfiError::Encode(EncodeError::InvalidConfig(_)) => FfiStatus::InvalidInput,
            FfiError::Encode(EncodeError::Verification(_)) => FfiStatus::Error,
        }
    }
}

// ============================================================================
// Owned buffers
// ============================================================================

/// An encoded buffer owned by Rust until handed to a foreign caller.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EncodedBuffer {
    data: Vec<u8>,
}

impl EncodedBuffer {
    /// Wrap encoded bytes.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Get the buffer data as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get raw pointer to data (for C FFI).
    pub fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    /// Get the buffer length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take back the bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Give up ownership. Release with [`EncodedBuffer::from_raw`].
    pub fn into_raw(self) -> (*mut u8, usize) {
        let boxed = self.data.into_boxed_slice();
        let len = boxed.len();
        (Box::into_raw(boxed).cast::<u8>(), len)
    }

    /// Reclaim a buffer released by [`EncodedBuffer::into_raw`].
    ///
    /// # Safety
    ///
    /// `ptr` and `len` must come from one `into_raw` call, and the buffer
    /// must not be reclaimed twice.
    pub unsafe fn from_raw(ptr: *mut u8, len: usize) -> Self {
        // SAFETY: Caller guarantees ptr/len describe a boxed slice from into_raw
        let boxed = unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)) };
        Self {
            data: boxed.into_vec(),
        }
    }
}

/// Encode a JSON tree document.
pub fn encode_json(json: &str, config: &EncoderConfig) -> FfiResult<EncodedBuffer> {
    let document = TreeDocument::from_json(json)
        .map_err(|e| FfiError::DeserializationError(e.to_string()))?;
    Ok(EncodedBuffer::from_vec(encode_document(&document, config)?))
}

/// Convert a C string to a Rust string slice.
///
/// # Safety
///
/// The pointer must be valid and null-terminated.
unsafe fn c_to_str<'a>(ptr: *const c_char) -> FfiResult<&'a str> {
    if ptr.is_null() {
        return Err(FfiError::NullPointer);
    }
    // SAFETY: Caller guarantees ptr is valid and null-terminated
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|e| FfiError::Utf8Error(e.to_string()))
}

// ============================================================================
// C entry points
// ============================================================================

/// Encode the null-terminated JSON document `json` with the default config.
///
/// On success writes the buffer to `*out_ptr` and its length to `*out_len`.
/// On failure both are left untouched.
///
/// # Safety
///
/// `json` must be a valid null-terminated string. `out_ptr` and `out_len`
/// must be valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn syntax_buffer_encode_json(
    json: *const c_char,
    out_ptr: *mut *mut u8,
    out_len: *mut usize,
) -> FfiStatus {
    if out_ptr.is_null() || out_len.is_null() {
        return FfiStatus::NullPointer;
    }
    // SAFETY: Caller guarantees json is null-terminated
    let result =
        unsafe { c_to_str(json) }.and_then(|json| encode_json(json, &EncoderConfig::default()));
    match result {
        Ok(buffer) => {
            let (ptr, len) = buffer.into_raw();
            // SAFETY: Both out pointers were checked for null and the caller
            // guarantees they are writable
            unsafe {
                *out_ptr = ptr;
                *out_len = len;
            }
            FfiStatus::Ok
        }
        Err(err) => {
            log::debug!("syntax_buffer_encode_json failed: {}", err);
            FfiStatus::from(&err)
        }
    }
}

/// Free a buffer returned by [`syntax_buffer_encode_json`].
///
/// # Safety
///
/// `ptr` and `len` must be exactly as returned, and each buffer freed once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn syntax_buffer_free(ptr: *mut u8, len: usize) {
    if !ptr.is_null() {
        // SAFETY: Caller guarantees ptr/len came from syntax_buffer_encode_json
        drop(unsafe { EncodedBuffer::from_raw(ptr, len) });
    }
}
