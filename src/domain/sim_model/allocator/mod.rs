pub mod resource_allocator;
