pub mod macb;
