pub(crate) mod buffer;
mod image_io;
