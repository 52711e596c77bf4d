pub mod catalog_memory;

pub use catalog_memory::InMemoryCatalogRepository;
