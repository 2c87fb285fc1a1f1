

// Context tests
mod context;

// Resolution tests
mod resolution;


// Engine tests
mod engine;
