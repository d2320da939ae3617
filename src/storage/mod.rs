/*! Specialized containers.

The `storage` module provides the per-category byte buffers in which a
client keeps everything it learned from servers, in wire form.
*/

mod option_store;

pub use self::option_store::{Category, OptionStore};
