//! 比特流读取器.
//!
//! FLAC 帧头、子帧与残差都以大端位序 (MSB first) 紧密排列, 引擎通过本模块逐位读取.

use crate::{YinError, YinResult};

/// 比特流读取器
///
/// 从借用的字节切片中按位读取数据, 使用大端位序 (MSB first).
///
/// # 示例
/// ```
/// use yin_core::bitreader::BitReader;
///
/// // 帧同步码 + 保留位 + 固定块大小标志
/// let header = [0xFF, 0xF8];
/// let mut br = BitReader::new(&header);
/// assert_eq!(br.read_bits(14).unwrap(), 0x3FFE);
/// assert_eq!(br.read_bit().unwrap(), 0);
/// assert_eq!(br.read_bit().unwrap(), 0);
/// assert!(br.is_eof());
/// ```
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前字节索引
    byte_pos: usize,
    /// 当前字节中的位位置 (0-7, 0 表示最高位)
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// 获取已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos as usize
    }

    /// 获取剩余可读位数
    pub fn bits_left(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bits_read())
    }

    /// 是否已到达末尾
    pub fn is_eof(&self) -> bool {
        self.bits_left() == 0
    }

    /// 当前是否位于字节边界
    pub fn is_byte_aligned(&self) -> bool {
        self.bit_pos == 0
    }

    /// 获取当前字节位置
    ///
    /// 未对齐时返回当前正在读取的字节索引.
    pub fn byte_position(&self) -> usize {
        self.byte_pos
    }

    /// 读取 1 个位
    pub fn read_bit(&mut self) -> YinResult<u32> {
        let Some(&byte) = self.data.get(self.byte_pos) else {
            return Err(YinError::Eof);
        };

        let bit = (byte >> (7 - self.bit_pos)) & 1;
        self.advance_bits(1);
        Ok(u32::from(bit))
    }

    /// 读取 N 个位 (最多 32 位)
    ///
    /// 返回值的低 N 位有效.
    pub fn read_bits(&mut self, n: u32) -> YinResult<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(YinError::InvalidArgument(format!(
                "read_bits: n={} 超过 32 位",
                n,
            )));
        }
        if n as usize > self.bits_left() {
            return Err(YinError::Eof);
        }

        let mut result: u64 = 0;
        let mut remaining = n;
        while remaining > 0 {
            let available = 8 - u32::from(self.bit_pos);
            let take = remaining.min(available);
            let shift = available - take;
            let mask = ((1u32 << take) - 1) as u8;
            let bits = (self.data[self.byte_pos] >> shift) & mask;

            result = (result << take) | u64::from(bits);
            self.advance_bits(take);
            remaining -= take;
        }

        Ok(result as u32)
    }

    /// 读取 N 个位 (最多 64 位)
    pub fn read_bits_u64(&mut self, n: u32) -> YinResult<u64> {
        if n <= 32 {
            return self.read_bits(n).map(u64::from);
        }
        if n > 64 {
            return Err(YinError::InvalidArgument(format!(
                "read_bits_u64: n={} 超过 64 位",
                n,
            )));
        }
        if n as usize > self.bits_left() {
            return Err(YinError::Eof);
        }

        let high = u64::from(self.read_bits(n - 32)?);
        let low = u64::from(self.read_bits(32)?);
        Ok((high << 32) | low)
    }

    /// 读取 N 位有符号整数 (二进制补码, 最多 32 位)
    pub fn read_bits_signed(&mut self, n: u32) -> YinResult<i32> {
        let raw = self.read_bits(n)?;
        if n == 0 || n == 32 {
            return Ok(raw as i32);
        }
        // 符号扩展: 左移到最高位再算术右移
        let shift = 32 - n;
        Ok(((raw << shift) as i32) >> shift)
    }

    /// 读取一元编码值 (unary code)
    ///
    /// 统计 `stop_bit` 出现前的相反位个数, 例如 `read_unary(1)` 从 `0001...` 得到 3.
    pub fn read_unary(&mut self, stop_bit: u32) -> YinResult<u32> {
        let stop = stop_bit & 1;
        let fill_byte = if stop == 1 { 0x00 } else { 0xFF };
        let mut count = 0u32;
        loop {
            // 整字节快速路径
            if self.bit_pos == 0 {
                while self.data.get(self.byte_pos) == Some(&fill_byte) {
                    self.byte_pos += 1;
                    count = count.saturating_add(8);
                }
            }
            if self.read_bit()? == stop {
                return Ok(count);
            }
            count = count.saturating_add(1);
        }
    }

    /// 读取一个 Rice 编码的有符号残差
    ///
    /// 商用一元码 (以 1 结束), 余数为 `k` 位, 最后做折叠映射还原:
    /// 0->0, 1->-1, 2->1, 3->-2, ...
    pub fn read_rice_signed(&mut self, k: u32) -> YinResult<i32> {
        let quotient = u64::from(self.read_unary(1)?);
        let remainder = u64::from(self.read_bits(k)?);
        let folded = (quotient << k) | remainder;
        let value = ((folded >> 1) as i64) ^ -((folded & 1) as i64);
        i32::try_from(value)
            .map_err(|_| YinError::InvalidData(format!("Rice 残差超出 32 位范围: {}", value)))
    }

    /// 读取 UTF-8 风格的可变长度编码 (FLAC 帧号/采样号)
    ///
    /// 这不是真正的 UTF-8, 最长 7 字节, 可表示 36 位的值.
    pub fn read_utf8_u64(&mut self) -> YinResult<u64> {
        let first = self.read_bits(8)? as u8;

        let (mut value, extra_bytes) = match first.leading_ones() {
            0 => (u64::from(first), 0),
            n @ 2..=6 => (u64::from(first & (0x7F >> n)), n - 1),
            7 => (0, 6),
            _ => {
                return Err(YinError::InvalidData(format!(
                    "无效的 UTF-8 变长编码首字节: 0x{:02X}",
                    first,
                )));
            }
        };

        for _ in 0..extra_bytes {
            let byte = self.read_bits(8)? as u8;
            if byte & 0xC0 != 0x80 {
                return Err(YinError::InvalidData(format!(
                    "无效的 UTF-8 变长编码后续字节: 0x{:02X}",
                    byte,
                )));
            }
            value = (value << 6) | u64::from(byte & 0x3F);
        }

        Ok(value)
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: usize) -> YinResult<()> {
        if n > self.bits_left() {
            return Err(YinError::Eof);
        }
        let total = self.bit_pos as usize + n;
        self.byte_pos += total / 8;
        self.bit_pos = (total % 8) as u8;
        Ok(())
    }

    /// 对齐到下一个字节边界
    ///
    /// 如果当前已在字节边界, 则不做任何事.
    pub fn align_to_byte(&mut self) {
        if self.bit_pos > 0 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }
    }

    fn advance_bits(&mut self, n: u32) {
        let total = u32::from(self.bit_pos) + n;
        self.byte_pos += (total / 8) as usize;
        self.bit_pos = (total % 8) as u8;
    }
}
