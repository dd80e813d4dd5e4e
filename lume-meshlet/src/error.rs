use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum MeshletError {
    EmptyIndexBuffer,
    IndexCountNotMultipleOfThree(usize),
    IndexOutOfRange { index: u32, vertex_count: usize },
    InvalidLimits { max_verts: usize, max_prims: usize },
    InvalidCacheSize(u32),
    AttributeCountMismatch { attributes: usize, triangles: usize },
    Library(String),
}

impl fmt::Display for MeshletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshletError::EmptyIndexBuffer => write!(f, "Index buffer is empty"),
            MeshletError::IndexCountNotMultipleOfThree(count) => {
                write!(f, "Index count {} is not a multiple of 3", count)
            }
            MeshletError::IndexOutOfRange { index, vertex_count } => {
                write!(f, "Index {} out of range for {} vertices", index, vertex_count)
            }
            MeshletError::InvalidLimits { max_verts, max_prims } => write!(
                f,
                "Invalid meshlet limits: {} vertices (3..={}), {} primitives (1..={})",
                max_verts,
                crate::MAX_VERTEX_COUNT,
                max_prims,
                crate::MAX_PRIMITIVE_COUNT
            ),
            MeshletError::InvalidCacheSize(size) => write!(
                f,
                "Invalid vertex cache size {} (at least {})",
                size,
                crate::processor::tipsify::MIN_CACHE_SIZE
            ),
            MeshletError::AttributeCountMismatch { attributes, triangles } => write!(
                f,
                "Attribute count {} does not match triangle count {}",
                attributes, triangles
            ),
            MeshletError::Library(msg) => write!(f, "Meshoptimizer Error: {}", msg),
        }
    }
}

impl std::error::Error for MeshletError {}

pub type MeshletResult<T> = Result<T, MeshletError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display() {
        let err = MeshletError::IndexOutOfRange { index: 9, vertex_count: 4 };
        assert_eq!(err.to_string(), "Index 9 out of range for 4 vertices");

        let err = MeshletError::InvalidLimits { max_verts: 65, max_prims: 124 };
        assert!(err.to_string().contains("65 vertices"));

        let err = MeshletError::InvalidCacheSize(2);
        assert_eq!(err.to_string(), "Invalid vertex cache size 2 (at least 3)");
    }
}
