// Library root
// -----------
// This crate exposes the library surface for the `tweetpin` CLI. The
// binary (`main.rs`) parses arguments, builds a `commands::Context` and
// hands the command line to the dispatcher.
//
// Module responsibilities:
// - `config`: app identity (consumer key/secret), proxy, env overrides.
// - `credential`: the stored access credential and its file store.
// - `oauth`: OAuth 1.0a header signing for outgoing requests.
// - `api`: the `ApiClient` trait plus the blocking HTTP implementation.
// - `auth`: the PIN handshake state machine.
// - `pager`: the cursor-following listing loop.
// - `commands`: command table, handlers and dispatcher.
// - `format`: display strings for profiles, followers and statuses.
// - `ui`: terminal prompts and colored output behind the `Ui` trait.
pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod credential;
pub mod error;
pub mod format;
pub mod oauth;
pub mod pager;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;
