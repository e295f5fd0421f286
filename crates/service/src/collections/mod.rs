pub mod doc_store;
