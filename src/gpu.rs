use anyhow::{Result, anyhow};
use ocl::{Buffer, Context, Device, Kernel, Platform, Program, Queue};

use crate::cl_kernels::SHA256D_BATCH;
use crate::error::ScanError;
use crate::hasher::BatchHasher;

/// Payloads must pad into a single SHA-256 block.
const MAX_MSG_LEN: usize = 55;
const INPUT_STRIDE: usize = 64;

/// OpenCL double-SHA256 backend.
///
/// High fixed dispatch latency, low per-candidate cost; callers amortize by
/// sending batches an order of magnitude larger than the CPU path uses.
pub struct ClHasher {
    q: Queue,
    prog: Program,
    device_name: String,
}

impl ClHasher {
    /// Prefer a GPU device; with `allow_npu`, fall back to dedicated
    /// accelerator devices before giving up.
    pub fn new(allow_npu: bool) -> Result<Self> {
        let platform = Platform::default();
        let mut devices = Device::list(platform, Some(ocl::flags::DEVICE_TYPE_GPU))?;
        if devices.is_empty() && allow_npu {
            devices = Device::list(platform, Some(ocl::flags::DEVICE_TYPE_ACCELERATOR))?;
        }
        let device = devices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No suitable compute device found"))?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let ctx = Context::builder()
            .platform(platform)
            .devices(device.clone())
            .build()?;
        let q = Queue::new(&ctx, device, None)?;
        let prog = Program::builder().src(SHA256D_BATCH).build(&ctx)?;
        Ok(Self {
            q,
            prog,
            device_name,
        })
    }

    fn run_batch(&self, payloads: &[Vec<u8>], msg_len: usize) -> Result<Vec<[u8; 32]>> {
        let count = payloads.len();
        let mut input = vec![0u8; count * INPUT_STRIDE];
        for (i, payload) in payloads.iter().enumerate() {
            input[i * INPUT_STRIDE..i * INPUT_STRIDE + payload.len()].copy_from_slice(payload);
        }

        let buf_in: Buffer<u8> = Buffer::builder()
            .queue(self.q.clone())
            .len(input.len())
            .copy_host_slice(&input)
            .build()?;
        let buf_out: Buffer<u8> = Buffer::builder()
            .queue(self.q.clone())
            .len(count * 32)
            .build()?;

        let kernel = Kernel::builder()
            .program(&self.prog)
            .name("sha256d_batch")
            .queue(self.q.clone())
            .global_work_size(count)
            .arg(&buf_in)
            .arg(&buf_out)
            .arg(&(count as u32))
            .arg(&(INPUT_STRIDE as u32))
            .arg(&(msg_len as u32))
            .build()?;

        unsafe {
            kernel.enq()?;
        }
        self.q.finish()?;

        let mut raw = vec![0u8; count * 32];
        buf_out.read(&mut raw).enq()?;

        let mut digests = Vec::with_capacity(count);
        for chunk in raw.chunks_exact(32) {
            let mut digest = [0u8; 32];
            digest.copy_from_slice(chunk);
            digests.push(digest);
        }
        Ok(digests)
    }
}

impl BatchHasher for ClHasher {
    fn compute_digest_batch(&self, payloads: &[Vec<u8>]) -> Result<Vec<[u8; 32]>, ScanError> {
        if payloads.is_empty() {
            return Ok(Vec::new());
        }
        let msg_len = payloads[0].len();
        if msg_len > MAX_MSG_LEN || payloads.iter().any(|p| p.len() != msg_len) {
            return Err(ScanError::Accelerator(format!(
                "batch payloads must share one length <= {MAX_MSG_LEN} bytes"
            )));
        }
        self.run_batch(payloads, msg_len)
            .map_err(|e| ScanError::Accelerator(e.to_string()))
    }

    fn device_info(&self) -> String {
        self.device_name.clone()
    }
}
