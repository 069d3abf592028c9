//! Integration tests

mod test_lifecycle;
mod test_stream;
mod test_websocket;
