//! Exchange-level tests against a scripted daemon.

mod support;
