//! 子帧解码: Constant / Verbatim / Fixed / LPC 以及 Rice 残差.
//!
//! 所有子帧都直接解码到调用方提供的声道槽位中, 不做额外分配.

use yin_core::bitreader::BitReader;
use yin_core::{YinError, YinResult};

/// LPC 最大阶数
const MAX_LPC_ORDER: usize = 32;

/// FLAC 子帧类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubframeType {
    Constant,
    Verbatim,
    /// 固定预测, 参数为阶数 (0-4)
    Fixed(usize),
    /// 线性预测, 参数为阶数 (1-32)
    Lpc(usize),
}

impl SubframeType {
    fn from_code(code: u32) -> YinResult<Self> {
        match code {
            0 => Ok(Self::Constant),
            1 => Ok(Self::Verbatim),
            8..=12 => Ok(Self::Fixed((code - 8) as usize)),
            32..=63 => Ok(Self::Lpc((code - 31) as usize)),
            _ => Err(YinError::InvalidData(format!(
                "FLAC 保留的子帧类型: {}",
                code,
            ))),
        }
    }
}

/// 解码一个子帧到 `out`, `out.len()` 即块大小
pub(crate) fn decode_subframe(br: &mut BitReader<'_>, out: &mut [i32], bps: u32) -> YinResult<()> {
    // 子帧头: padding (1 bit) + type (6 bits) + wasted bits flag (1 bit)
    if br.read_bit()? != 0 {
        return Err(YinError::InvalidData("子帧头填充位不为 0".into()));
    }
    let subframe_type = SubframeType::from_code(br.read_bits(6)?)?;
    let wasted_bits = if br.read_bit()? != 0 {
        br.read_unary(1)?.saturating_add(1)
    } else {
        0
    };
    if wasted_bits >= bps {
        return Err(YinError::InvalidData(format!(
            "wasted bits {} 不小于位深 {}",
            wasted_bits, bps,
        )));
    }

    let effective_bps = bps - wasted_bits;
    match subframe_type {
        SubframeType::Constant => {
            let value = br.read_bits_signed(effective_bps)?;
            out.fill(value);
        }
        SubframeType::Verbatim => {
            for sample in out.iter_mut() {
                *sample = br.read_bits_signed(effective_bps)?;
            }
        }
        SubframeType::Fixed(order) => decode_fixed(br, out, effective_bps, order)?,
        SubframeType::Lpc(order) => decode_lpc(br, out, effective_bps, order)?,
    }

    if wasted_bits > 0 {
        for sample in out.iter_mut() {
            *sample <<= wasted_bits;
        }
    }
    Ok(())
}

/// 读取预测器的 warm-up 样本
fn read_warmup(
    br: &mut BitReader<'_>,
    out: &mut [i32],
    bps: u32,
    order: usize,
) -> YinResult<()> {
    if order > out.len() {
        return Err(YinError::InvalidData(format!(
            "预测阶数 {} 大于块大小 {}",
            order,
            out.len(),
        )));
    }
    for sample in &mut out[..order] {
        *sample = br.read_bits_signed(bps)?;
    }
    Ok(())
}

/// 解码 Fixed 预测子帧
fn decode_fixed(br: &mut BitReader<'_>, out: &mut [i32], bps: u32, order: usize) -> YinResult<()> {
    read_warmup(br, out, bps, order)?;
    decode_residual(br, out, order)?;

    for i in order..out.len() {
        let s = |back: usize| i64::from(out[i - back]);
        let predicted = match order {
            0 => 0,
            1 => s(1),
            2 => 2 * s(1) - s(2),
            3 => 3 * s(1) - 3 * s(2) + s(3),
            _ => 4 * s(1) - 6 * s(2) + 4 * s(3) - s(4),
        };
        out[i] = (predicted + i64::from(out[i])) as i32;
    }
    Ok(())
}

/// 解码 LPC 预测子帧
fn decode_lpc(br: &mut BitReader<'_>, out: &mut [i32], bps: u32, order: usize) -> YinResult<()> {
    read_warmup(br, out, bps, order)?;

    // 系数精度 (4 bits), 0b1111 无效
    let precision_code = br.read_bits(4)?;
    if precision_code == 0x0F {
        return Err(YinError::InvalidData("无效的 LPC 精度编码".into()));
    }
    let precision = precision_code + 1;

    // 量化移位 (5 bits, 有符号)
    let shift = br.read_bits_signed(5)?;
    if shift < 0 {
        return Err(YinError::InvalidData(format!("LPC 移位量为负: {}", shift)));
    }

    let mut coefficients = [0i64; MAX_LPC_ORDER];
    for coefficient in &mut coefficients[..order] {
        *coefficient = i64::from(br.read_bits_signed(precision)?);
    }

    decode_residual(br, out, order)?;

    let coefficients = &coefficients[..order];
    for i in order..out.len() {
        let predicted: i64 = coefficients
            .iter()
            .zip(out[i - order..i].iter().rev())
            .map(|(&c, &s)| c * i64::from(s))
            .sum();
        out[i] = ((predicted >> shift) + i64::from(out[i])) as i32;
    }
    Ok(())
}

/// 解码 Rice 残差到 `out[order..]`
fn decode_residual(br: &mut BitReader<'_>, out: &mut [i32], order: usize) -> YinResult<()> {
    let (param_bits, escape_code) = match br.read_bits(2)? {
        0 => (4, 0x0F),
        1 => (5, 0x1F),
        method => {
            return Err(YinError::InvalidData(format!(
                "无效的残差编码方式: {}",
                method,
            )));
        }
    };

    let partition_order = br.read_bits(4)?;
    let block_size = out.len();
    let partition_len = block_size >> partition_order;
    if partition_len << partition_order != block_size || partition_len < order {
        return Err(YinError::InvalidData(format!(
            "残差分区阶数 {} 与块大小 {} / 预测阶数 {} 不匹配",
            partition_order, block_size, order,
        )));
    }

    let mut start = order;
    for partition in 1..=(1usize << partition_order) {
        let end = partition * partition_len;
        let param = br.read_bits(param_bits)?;
        if param == escape_code {
            // 逃逸分区: 每个残差用固定位数表示
            let bits = br.read_bits(5)?;
            for sample in &mut out[start..end] {
                *sample = br.read_bits_signed(bits)?;
            }
        } else {
            for sample in &mut out[start..end] {
                *sample = br.read_rice_signed(param)?;
            }
        }
        start = end;
    }
    Ok(())
}
