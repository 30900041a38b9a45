use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_INSTANCE: AtomicU32 = AtomicU32::new(1);

/// Identity of one scanner instance, assigned once at construction from a
/// process-wide sequence and immutable afterwards.
#[derive(Debug, Clone)]
pub struct InstanceIdentity {
    pub instance_id: String,
    pub instance_number: u32,
    pub output_file: PathBuf,
}

impl InstanceIdentity {
    pub fn next(output_dir: &Path) -> Self {
        let n = NEXT_INSTANCE.fetch_add(1, Ordering::SeqCst);
        Self {
            instance_id: format!("instance_{n}"),
            instance_number: n,
            output_file: output_dir.join(format!("wallets_{n}.txt")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_numbers_are_sequential_and_unique() {
        let dir = PathBuf::from("/tmp");
        let a = InstanceIdentity::next(&dir);
        let b = InstanceIdentity::next(&dir);
        assert!(b.instance_number > a.instance_number);
        assert_ne!(a.output_file, b.output_file);
        assert_eq!(a.instance_id, format!("instance_{}", a.instance_number));
    }
}
