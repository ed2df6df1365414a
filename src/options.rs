//! 解码选项.

use serde::{Deserialize, Serialize};
use yin_flac::EngineConfig;

/// 解码选项
///
/// 默认值与 [`crate::decode`] 的行为一致. 可以从 JSON 等配置文件反序列化,
/// 缺失的字段使用默认值.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// 帧头/帧尾 CRC 不匹配时是否终止帧循环
    pub verify_crc: bool,
    /// 是否逐帧检查帧头的采样率、声道数、位深与 STREAMINFO 一致
    pub check_frame_parameters: bool,
    /// 是否用 STREAMINFO 中的 MD5 签名校验解码结果
    pub verify_md5: bool,
    /// 输出采样总数 (所有声道) 的上限
    pub max_output_samples: Option<u64>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            verify_crc: true,
            check_frame_parameters: false,
            verify_md5: false,
            max_output_samples: None,
        }
    }
}

impl DecodeOptions {
    /// 对应的原生引擎配置
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            verify_crc: self.verify_crc,
        }
    }
}
