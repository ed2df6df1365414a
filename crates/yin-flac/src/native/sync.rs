//! 同步点搜索.
//!
//! 帧同步码只有 14 位, 很容易在音频数据中偶然出现, 所以每个候选位置都要检查
//! 帧头各字段的合法性并验证 CRC-8, 以排除假同步码.

use yin_core::crc;

use crate::metadata::STREAM_MARKER;

/// FLAC 帧同步码 (14 bits: 0b11111111111110, 外加必须为 0 的保留位)
const FRAME_SYNC_CODE: u16 = 0xFFF8;
/// 同步码掩码 (高 15 位)
const FRAME_SYNC_MASK: u16 = 0xFFFE;

/// 码流起点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamStart {
    /// "fLaC" 标记的偏移
    Marker(usize),
    /// 无元数据的裸帧序列, 首帧的偏移
    Frame(usize),
}

/// 搜索码流起点
///
/// 优先在整个输入中查找 "fLaC" 标记, 标记之前的标签等数据里可能含有形似帧头的字节.
/// 只有找不到标记时才退回到首个有效帧头 (无元数据的裸帧序列).
pub(crate) fn find_stream_start(buf: &[u8]) -> Option<StreamStart> {
    buf.windows(STREAM_MARKER.len())
        .position(|window| window == STREAM_MARKER)
        .map(StreamStart::Marker)
        .or_else(|| find_frame_sync(buf, 0).map(StreamStart::Frame))
}

/// 从指定偏移开始搜索下一个有效帧同步码
pub(crate) fn find_frame_sync(buf: &[u8], start: usize) -> Option<usize> {
    (start..buf.len()).find(|&i| is_frame_header(&buf[i..]))
}

/// 判断 `data` 是否以一个完整且 CRC-8 正确的帧头开始
pub(crate) fn is_frame_header(data: &[u8]) -> bool {
    // sync(2) + byte2 + byte3 + utf8(至少 1) + crc8(1)
    if data.len() < 6 {
        return false;
    }
    let word = u16::from_be_bytes([data[0], data[1]]);
    if word & FRAME_SYNC_MASK != FRAME_SYNC_CODE {
        return false;
    }

    let bs_code = data[2] >> 4;
    let sr_code = data[2] & 0x0F;
    let ch_code = data[3] >> 4;
    let ss_code = (data[3] >> 1) & 0x07;
    let reserved = data[3] & 0x01;

    // 块大小编码 0 保留, 采样率编码 15 无效, 声道分配 11-15 保留, 采样大小 3 保留
    if reserved != 0 || bs_code == 0 || sr_code == 15 || ch_code > 10 || ss_code == 3 {
        return false;
    }

    match header_len(data, bs_code, sr_code) {
        Some(len) if len < data.len() => data[len] == crc::crc8(&data[..len]),
        _ => false,
    }
}

/// 计算不含 CRC-8 的帧头长度
///
/// 帧头结构: sync(2) + byte2 + byte3 + utf8(1-7) + [ext_bs] + [ext_sr]
fn header_len(data: &[u8], bs_code: u8, sr_code: u8) -> Option<usize> {
    let utf8_len = match data[4].leading_ones() {
        0 => 1,
        n @ 2..=7 => n as usize,
        _ => return None,
    };
    let utf8_end = 4 + utf8_len;
    let continuation = data.get(5..utf8_end)?;
    if continuation.iter().any(|&b| b & 0xC0 != 0x80) {
        return None;
    }

    let ext_bs = match bs_code {
        6 => 1,
        7 => 2,
        _ => 0,
    };
    let ext_sr = match sr_code {
        12 => 1,
        13 | 14 => 2,
        _ => 0,
    };
    Some(utf8_end + ext_bs + ext_sr)
}
