//! Capture session management
//!
//! Owns the single live camera+microphone stream and binds it to the
//! preview surface.

mod session;

pub use session::{Acquired, CaptureSession, CaptureSessionManager};
