//! STREAMINFO MD5 签名校验.
//!
//! 签名覆盖的是未编码的交错采样: 每个采样按小端序写出 `ceil(bps / 8)` 个字节.

use tracing::debug;

use crate::error::DecodeError;

/// 计算交错采样的 MD5
pub(crate) fn compute(samples: &[i32], bits_per_sample: u32) -> [u8; 16] {
    let width = bits_per_sample.div_ceil(8) as usize;
    let mut context = md5::Context::new();
    let mut chunk = Vec::with_capacity(4096 * width);
    for block in samples.chunks(4096) {
        chunk.clear();
        for &sample in block {
            chunk.extend_from_slice(&sample.to_le_bytes()[..width]);
        }
        context.consume(&chunk);
    }
    context.compute().0
}

/// 校验解码结果与签名一致
pub(crate) fn verify(
    expected: &[u8; 16],
    samples: &[i32],
    bits_per_sample: u32,
) -> Result<(), DecodeError> {
    let actual = compute(samples, bits_per_sample);
    if &actual != expected {
        return Err(DecodeError::Md5Mismatch {
            expected: *expected,
            actual,
        });
    }
    debug!("MD5 校验通过");
    Ok(())
}
