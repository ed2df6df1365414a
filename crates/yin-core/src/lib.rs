//! # yin-core
//!
//! Yin 解码管线的核心库, 提供统一错误类型、比特流读写与 CRC 校验.
//!
//! 上层的 FLAC 引擎 (`yin-flac`) 与解码管线 (`yin`) 都建立在这里的基础设施之上.

pub mod bitreader;
pub mod bitwriter;
pub mod crc;
pub mod error;

// 重导出常用类型
pub use error::{CrcKind, YinError, YinResult};
