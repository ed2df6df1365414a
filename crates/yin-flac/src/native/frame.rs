//! 帧解码: 帧头解析、子帧调度、声道去相关与 CRC 校验.

use log::warn;
use yin_core::bitreader::BitReader;
use yin_core::{CrcKind, YinError, YinResult, crc};

use super::subframe::decode_subframe;
use crate::engine::{ChannelAssignment, FrameHeader, FrameNumber};
use crate::scratch::FrameScratch;

/// 帧头同步码 (14 bits)
const SYNC_CODE: u32 = 0b11_1111_1111_1110;

/// 解码单帧所需的上下文
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameContext {
    /// STREAMINFO 中的采样率 (帧头采样率编码为 0 时使用)
    pub stream_sample_rate: Option<u32>,
    /// STREAMINFO 中的位深 (帧头采样大小编码为 0 时使用)
    pub stream_bits_per_sample: Option<u32>,
    /// CRC 不匹配时是否报错
    pub verify_crc: bool,
}

/// 解码 `data` 开头的一帧, 返回 (帧字节数, 帧头)
pub(crate) fn decode_frame(
    data: &[u8],
    ctx: &FrameContext,
    scratch: &mut FrameScratch,
) -> YinResult<(usize, FrameHeader)> {
    let mut br = BitReader::new(data);
    let header = parse_frame_header(&mut br, data, ctx)?;
    FrameScratch::ensure_fits(header.channels, header.block_size)?;

    let block_size = header.block_size as usize;
    let bps = header.bits_per_sample;
    for ch in 0..header.channels as usize {
        let sub_bps = match header.channel_assignment {
            ChannelAssignment::LeftSide | ChannelAssignment::MidSide if ch == 1 => bps + 1,
            ChannelAssignment::RightSide if ch == 0 => bps + 1,
            _ => bps,
        };
        if sub_bps > 32 {
            return Err(YinError::Unsupported(format!(
                "side 声道位深 {} 超过 32 位",
                sub_bps,
            )));
        }
        decode_subframe(&mut br, &mut scratch.channel_mut(ch)[..block_size], sub_bps)?;
    }

    decorrelate(scratch, header.channel_assignment, block_size);

    // 帧尾: 字节对齐 + CRC-16
    br.align_to_byte();
    let frame_end = br.byte_position();
    let crc_read = br.read_bits(16)? as u16;
    let crc_calc = crc::crc16(&data[..frame_end]);
    check_crc(CrcKind::Frame, crc_read, crc_calc, ctx.verify_crc)?;

    Ok((frame_end + 2, header))
}

/// 解析帧头 (含 CRC-8)
fn parse_frame_header(
    br: &mut BitReader<'_>,
    raw_data: &[u8],
    ctx: &FrameContext,
) -> YinResult<FrameHeader> {
    let sync = br.read_bits(14)?;
    if sync != SYNC_CODE {
        return Err(YinError::InvalidData(format!(
            "无效的 FLAC 同步码: 0x{:04X}",
            sync,
        )));
    }
    if br.read_bit()? != 0 {
        return Err(YinError::InvalidData("帧头保留位不为 0".into()));
    }
    let variable_block_size = br.read_bit()? != 0;

    let bs_code = br.read_bits(4)?;
    let sr_code = br.read_bits(4)?;
    let ch_code = br.read_bits(4)?;
    let ss_code = br.read_bits(3)?;
    if br.read_bit()? != 0 {
        return Err(YinError::InvalidData("帧头保留位不为 0".into()));
    }

    let coded_number = br.read_utf8_u64()?;
    let number = if variable_block_size {
        FrameNumber::Sample(coded_number)
    } else {
        FrameNumber::Frame(coded_number)
    };

    let block_size = match bs_code {
        0 => return Err(YinError::InvalidData("FLAC block_size code 0 保留".into())),
        1 => 192,
        2..=5 => 576 << (bs_code - 2),
        6 => br.read_bits(8)? + 1,
        7 => br.read_bits(16)? + 1,
        _ => 256 << (bs_code - 8),
    };

    let sample_rate = match sr_code {
        0 => ctx.stream_sample_rate.ok_or_else(|| {
            YinError::InvalidData("帧头要求使用 STREAMINFO 采样率, 但尚未读到 STREAMINFO".into())
        })?,
        1 => 88200,
        2 => 176400,
        3 => 192000,
        4 => 8000,
        5 => 16000,
        6 => 22050,
        7 => 24000,
        8 => 32000,
        9 => 44100,
        10 => 48000,
        11 => 96000,
        12 => br.read_bits(8)? * 1000,
        13 => br.read_bits(16)?,
        14 => br.read_bits(16)? * 10,
        _ => return Err(YinError::InvalidData("FLAC sample_rate code 15 无效".into())),
    };

    let channel_assignment = match ch_code {
        0..=7 => ChannelAssignment::Independent(ch_code + 1),
        8 => ChannelAssignment::LeftSide,
        9 => ChannelAssignment::RightSide,
        10 => ChannelAssignment::MidSide,
        _ => {
            return Err(YinError::InvalidData(format!(
                "无效的 FLAC 声道分配: {}",
                ch_code,
            )));
        }
    };

    let bits_per_sample = match ss_code {
        0 => ctx.stream_bits_per_sample.ok_or_else(|| {
            YinError::InvalidData("帧头要求使用 STREAMINFO 位深, 但尚未读到 STREAMINFO".into())
        })?,
        1 => 8,
        2 => 12,
        3 => return Err(YinError::InvalidData("FLAC sample_size code 3 保留".into())),
        4 => 16,
        5 => 20,
        6 => 24,
        _ => 32,
    };

    let header_end = br.byte_position();
    let crc_read = br.read_bits(8)?;
    let crc_calc = crc::crc8(&raw_data[..header_end]);
    check_crc(
        CrcKind::Header,
        crc_read as u16,
        u16::from(crc_calc),
        ctx.verify_crc,
    )?;

    Ok(FrameHeader {
        block_size,
        sample_rate,
        channel_assignment,
        channels: channel_assignment.channels(),
        bits_per_sample,
        number,
    })
}

fn check_crc(kind: CrcKind, expected: u16, actual: u16, verify: bool) -> YinResult<()> {
    if expected == actual {
        return Ok(());
    }
    if verify {
        return Err(YinError::CrcMismatch {
            kind,
            expected,
            actual,
        });
    }
    warn!(
        "{} 不匹配 (已忽略): 读取=0x{:04X}, 计算=0x{:04X}",
        kind, expected, actual,
    );
    Ok(())
}

/// 立体声去相关, 还原出左右声道
fn decorrelate(scratch: &mut FrameScratch, assignment: ChannelAssignment, block_size: usize) {
    if let ChannelAssignment::Independent(_) = assignment {
        return;
    }
    let (first, second) = scratch.stereo_mut();
    let pairs = first[..block_size].iter_mut().zip(&mut second[..block_size]);

    match assignment {
        ChannelAssignment::LeftSide => {
            // ch0 = left, ch1 = side -> ch1 = left - side
            for (left, side) in pairs {
                *side = (i64::from(*left) - i64::from(*side)) as i32;
            }
        }
        ChannelAssignment::RightSide => {
            // ch0 = side, ch1 = right -> ch0 = side + right
            for (side, right) in pairs {
                *side = (i64::from(*side) + i64::from(*right)) as i32;
            }
        }
        ChannelAssignment::MidSide => {
            for (mid, side) in pairs {
                let s = i64::from(*side);
                let m = (i64::from(*mid) << 1) | (s & 1);
                *mid = ((m + s) >> 1) as i32;
                *side = ((m - s) >> 1) as i32;
            }
        }
        ChannelAssignment::Independent(_) => {}
    }
}
