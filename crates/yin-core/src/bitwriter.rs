//! 比特流写入器.
//!
//! 与 [`BitReader`](crate::bitreader::BitReader) 对应, 按大端位序写入.
//! 主要用于构造测试与基准测试所需的 FLAC 码流.

/// 比特流写入器
///
/// # 示例
/// ```
/// use yin_core::bitwriter::BitWriter;
///
/// // 最后一个元数据块, 类型 STREAMINFO, 长度 34
/// let mut bw = BitWriter::new();
/// bw.write_bit(1);
/// bw.write_bits(0, 7);
/// bw.write_bits(34, 24);
/// assert_eq!(bw.finish(), vec![0x80, 0x00, 0x00, 0x22]);
/// ```
#[derive(Debug, Default)]
pub struct BitWriter {
    /// 已完成的字节
    data: Vec<u8>,
    /// 尚未凑满一个字节的位 (低 `pending_bits` 位有效)
    pending: u64,
    /// `pending` 中的有效位数 (0-7)
    pending_bits: u32,
}

impl BitWriter {
    /// 创建新的比特流写入器
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.data.len() * 8 + self.pending_bits as usize
    }

    /// 当前是否位于字节边界
    pub fn is_byte_aligned(&self) -> bool {
        self.pending_bits == 0
    }

    /// 写入 1 个位
    pub fn write_bit(&mut self, bit: u32) {
        self.write_bits(bit & 1, 1);
    }

    /// 写入 N 个位 (最多 32 位), 值的低 N 位被写入, 高位在前
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "write_bits: n={} 超过 32 位", n);
        if n == 0 {
            return;
        }
        let masked = u64::from(value) & ((1u64 << n) - 1);
        self.pending = (self.pending << n) | masked;
        self.pending_bits += n;
        while self.pending_bits >= 8 {
            self.pending_bits -= 8;
            self.data.push((self.pending >> self.pending_bits) as u8);
        }
        self.pending &= (1u64 << self.pending_bits) - 1;
    }

    /// 写入 N 个位 (最多 64 位)
    pub fn write_bits_u64(&mut self, value: u64, n: u32) {
        if n > 32 {
            self.write_bits((value >> 32) as u32, n - 32);
            self.write_bits(value as u32, 32);
        } else {
            self.write_bits(value as u32, n);
        }
    }

    /// 写入 N 位有符号整数 (二进制补码)
    pub fn write_bits_signed(&mut self, value: i32, n: u32) {
        self.write_bits(value as u32, n);
    }

    /// 写入一元编码: `count` 个 `!stop_bit`, 然后一个 `stop_bit`
    pub fn write_unary(&mut self, count: u32, stop_bit: u32) {
        let fill = 1 - (stop_bit & 1);
        for _ in 0..count {
            self.write_bit(fill);
        }
        self.write_bit(stop_bit);
    }

    /// 写入 UTF-8 风格变长编码 (FLAC 帧号/采样号)
    pub fn write_utf8_u64(&mut self, value: u64) {
        if value < 0x80 {
            self.write_bits(value as u32, 8);
            return;
        }

        // 续字节数: 每个续字节携带 6 位, 首字节可携带 (6 - 续字节数) 位
        let mut extra = 1u32;
        while extra < 6 && value >= 1u64 << (6 * extra + (6 - extra)) {
            extra += 1;
        }
        let lead_mask = !(0xFFu32 >> (extra + 1)) & 0xFF;
        self.write_bits(lead_mask | (value >> (6 * extra)) as u32, 8);
        for i in (0..extra).rev() {
            self.write_bits(0x80 | ((value >> (6 * i)) as u32 & 0x3F), 8);
        }
    }

    /// 对齐到字节边界 (用 0 填充)
    pub fn align_to_byte(&mut self) {
        if self.pending_bits > 0 {
            self.write_bits(0, 8 - self.pending_bits);
        }
    }

    /// 完成写入, 返回字节数据 (不足一字节时用 0 填充)
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.data
    }
}
