//! # yin-flac
//!
//! FLAC 比特流解码引擎.
//!
//! 引擎只负责"怎样读懂码流": 同步、元数据块分类、STREAMINFO 字段提取以及
//! 单帧解码 (Rice 残差、Fixed/LPC 预测、声道去相关、CRC 校验).
//! 把多个帧拼成完整波形的工作由上层解码管线完成.
//!
//! ## 使用示例
//!
//! ```rust
//! use yin_flac::{BitstreamEngine, NativeEngine};
//!
//! let mut engine = NativeEngine::new();
//! // 输入里找不到任何同步点
//! assert!(engine.sync(b"not a flac stream").is_err());
//! ```

pub mod engine;
pub mod metadata;
pub mod native;
pub mod scratch;

// 重导出常用类型
pub use engine::{BitstreamEngine, ChannelAssignment, FrameHeader, FrameNumber, StreamInfoField};
pub use metadata::{MetadataBlockHeader, MetadataBlockType};
pub use native::{EngineConfig, NativeEngine};
pub use scratch::{FrameScratch, MAX_BLOCK_SIZE, MAX_CHANNELS};
