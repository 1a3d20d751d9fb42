pub mod cursor;
pub mod document_repository;
pub mod errors;
pub mod etag;
pub mod in_memory_object_store;
pub mod key_codec;
pub mod merge;
pub mod object_store;
pub mod s3_object_store;
