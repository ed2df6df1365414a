//! # Yin (音)
//!
//! 纯 Rust 实现的 FLAC 流式解码管线.
//!
//! 输入一段完整的内存 FLAC 码流, 输出 [`Waveform`]: 声道数、采样率、
//! 原始位深以及按声道交错的整数采样.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! let data = std::fs::read("input.flac").unwrap();
//! let waveform = yin::decode(&data).unwrap();
//! println!(
//!     "{} Hz, {} 声道, {} 位, {} 个采样",
//!     waveform.sample_rate(),
//!     waveform.channels(),
//!     waveform.source_bit_depth(),
//!     waveform.samples().len(),
//! );
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `yin-core` | 错误类型、位读写、CRC |
//! | `yin-flac` | FLAC 比特流引擎 |
//! | `yin` | 解码管线与日志 |

/// 核心类型与工具
pub use yin_core as core;

/// FLAC 比特流引擎
pub use yin_flac as flac;

pub mod error;
pub mod logging;
pub mod options;
mod pipeline;
pub mod waveform;

pub use error::DecodeError;
pub use options::DecodeOptions;
pub use pipeline::StreamParameters;
pub use waveform::Waveform;

use yin_flac::{BitstreamEngine, NativeEngine};

/// 使用默认选项解码一段完整的 FLAC 码流
///
/// 要么返回采样数与 STREAMINFO 声明完全一致的波形, 要么返回错误,
/// 不会返回部分结果.
pub fn decode(data: &[u8]) -> Result<Waveform, DecodeError> {
    decode_with_options(data, &DecodeOptions::default())
}

/// 使用指定选项解码
pub fn decode_with_options(data: &[u8], options: &DecodeOptions) -> Result<Waveform, DecodeError> {
    let mut engine = NativeEngine::with_config(options.engine_config());
    decode_with_engine(&mut engine, data, options)
}

/// 使用调用方提供的引擎解码
///
/// 引擎在解码开始时被重置, 解码期间由本次调用独占.
pub fn decode_with_engine<E>(
    engine: &mut E,
    data: &[u8],
    options: &DecodeOptions,
) -> Result<Waveform, DecodeError>
where
    E: BitstreamEngine + ?Sized,
{
    pipeline::run(engine, data, options)
}
