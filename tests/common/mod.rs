//! 集成测试共用的 FLAC 码流构造器.
//!
//! 用 `BitWriter` 按 FLAC 格式编码合成信号, 支持 Constant / Verbatim /
//! Fixed / LPC 子帧、三种立体声去相关模式以及元数据块的任意排列.

#![allow(dead_code)]

use yin::core::bitwriter::BitWriter;
use yin::core::crc;

/// 元数据块类型码
pub const BLOCK_PADDING: u8 = 1;
pub const BLOCK_APPLICATION: u8 = 2;
pub const BLOCK_VORBIS_COMMENT: u8 = 4;

/// 子帧编码方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubframeKind {
    /// 要求该声道所有采样相同
    Constant,
    Verbatim,
    /// 固定预测, 阶数 0-4
    Fixed(usize),
    /// 线性预测: 量化系数、系数精度、移位量
    Lpc {
        coefficients: Vec<i32>,
        precision: u32,
        shift: u32,
    },
}

/// 立体声编码模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StereoMode {
    Independent,
    LeftSide,
    RightSide,
    MidSide,
}

/// 单帧编码选项
#[derive(Debug, Clone)]
pub struct FrameOptions {
    pub subframe: SubframeKind,
    pub stereo: StereoMode,
    /// 在帧头中显式写出采样率和位深, 否则使用编码 0 (取 STREAMINFO)
    pub explicit_header: bool,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            subframe: SubframeKind::Verbatim,
            stereo: StereoMode::Independent,
            explicit_header: true,
        }
    }
}

impl FrameOptions {
    pub fn subframe(subframe: SubframeKind) -> Self {
        Self {
            subframe,
            ..Self::default()
        }
    }

    pub fn stereo(mut self, stereo: StereoMode) -> Self {
        self.stereo = stereo;
        self
    }

    pub fn stream_info_header(mut self) -> Self {
        self.explicit_header = false;
        self
    }
}

/// 合成 FLAC 码流构造器
pub struct FlacBuilder {
    sample_rate: u32,
    channels: u32,
    bits_per_sample: u32,
    total_override: Option<u64>,
    declared_rate: Option<u32>,
    with_md5: bool,
    with_marker: bool,
    with_stream_info: bool,
    leading_blocks: Vec<(u8, Vec<u8>)>,
    trailing_blocks: Vec<(u8, Vec<u8>)>,
    frames: Vec<Vec<u8>>,
    block_sizes: Vec<u32>,
    samples: Vec<Vec<i32>>,
}

impl FlacBuilder {
    pub fn new(sample_rate: u32, channels: u32, bits_per_sample: u32) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
            total_override: None,
            declared_rate: None,
            with_md5: false,
            with_marker: true,
            with_stream_info: true,
            leading_blocks: Vec::new(),
            trailing_blocks: Vec::new(),
            frames: Vec::new(),
            block_sizes: Vec::new(),
            samples: vec![Vec::new(); channels as usize],
        }
    }

    /// 覆盖 STREAMINFO 中的总采样数
    pub fn total_samples(mut self, total: u64) -> Self {
        self.total_override = Some(total);
        self
    }

    /// 在 STREAMINFO 中声明与帧头不同的采样率
    pub fn declared_sample_rate(mut self, rate: u32) -> Self {
        self.declared_rate = Some(rate);
        self
    }

    /// 在 STREAMINFO 中写入真实的 MD5 签名
    pub fn with_md5(mut self) -> Self {
        self.with_md5 = true;
        self
    }

    /// 省略 "fLaC" 标记和所有元数据, 只输出帧
    pub fn frames_only(mut self) -> Self {
        self.with_marker = false;
        self
    }

    /// 省略 STREAMINFO 块, 保留其他元数据块
    pub fn without_stream_info(mut self) -> Self {
        self.with_stream_info = false;
        self
    }

    /// 在 STREAMINFO 之前插入一个元数据块
    pub fn block_before(mut self, block_type: u8, body: Vec<u8>) -> Self {
        self.leading_blocks.push((block_type, body));
        self
    }

    /// 在 STREAMINFO 之后插入一个元数据块
    pub fn block_after(mut self, block_type: u8, body: Vec<u8>) -> Self {
        self.trailing_blocks.push((block_type, body));
        self
    }

    /// 编码一帧, `channels[c]` 为第 c 个声道的采样
    pub fn frame(mut self, options: &FrameOptions, channels: &[Vec<i32>]) -> Self {
        assert_eq!(channels.len(), self.channels as usize, "声道数与流参数不一致");
        let block_size = channels[0].len();
        assert!(channels.iter().all(|ch| ch.len() == block_size));

        let encoded = encode_frame(
            self.frames.len() as u64,
            self.sample_rate,
            self.bits_per_sample,
            options,
            channels,
        );
        self.frames.push(encoded);
        self.block_sizes.push(block_size as u32);
        for (acc, ch) in self.samples.iter_mut().zip(channels) {
            acc.extend_from_slice(ch);
        }
        self
    }

    /// 按声道交错的全部源采样
    pub fn interleaved(&self) -> Vec<i32> {
        interleave(&self.samples)
    }

    pub fn build(&self) -> Vec<u8> {
        self.build_with_offsets().0
    }

    /// 输出码流以及每一帧的起始偏移
    pub fn build_with_offsets(&self) -> (Vec<u8>, Vec<usize>) {
        let mut data = Vec::new();
        if self.with_marker {
            data.extend_from_slice(b"fLaC");
            let mut blocks: Vec<(u8, Vec<u8>)> = self.leading_blocks.clone();
            if self.with_stream_info {
                blocks.push((0, self.stream_info_body()));
            }
            blocks.extend(self.trailing_blocks.iter().cloned());

            let count = blocks.len();
            for (i, (block_type, body)) in blocks.into_iter().enumerate() {
                let last = if i + 1 == count { 0x80 } else { 0 };
                data.push(last | block_type);
                data.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
                data.extend_from_slice(&body);
            }
        }

        let mut offsets = Vec::with_capacity(self.frames.len());
        for frame in &self.frames {
            offsets.push(data.len());
            data.extend_from_slice(frame);
        }
        (data, offsets)
    }

    fn stream_info_body(&self) -> Vec<u8> {
        let min_block = self.block_sizes.iter().copied().min().unwrap_or(4096);
        let max_block = self.block_sizes.iter().copied().max().unwrap_or(4096);
        let total = self
            .total_override
            .unwrap_or_else(|| self.block_sizes.iter().map(|&b| u64::from(b)).sum());

        let mut bw = BitWriter::new();
        bw.write_bits(min_block, 16);
        bw.write_bits(max_block, 16);
        bw.write_bits(0, 24);
        bw.write_bits(0, 24);
        bw.write_bits(self.declared_rate.unwrap_or(self.sample_rate), 20);
        bw.write_bits(self.channels - 1, 3);
        bw.write_bits(self.bits_per_sample - 1, 5);
        bw.write_bits_u64(total, 36);
        let md5 = if self.with_md5 {
            md5_of(&self.interleaved(), self.bits_per_sample)
        } else {
            [0; 16]
        };
        for byte in md5 {
            bw.write_bits(u32::from(byte), 8);
        }
        bw.finish()
    }
}

/// 把按声道存放的采样交错
pub fn interleave(channels: &[Vec<i32>]) -> Vec<i32> {
    let len = channels.first().map_or(0, Vec::len);
    (0..len)
        .flat_map(|i| channels.iter().map(move |ch| ch[i]))
        .collect()
}

/// FLAC 签名使用的 MD5: 每采样 ceil(bps/8) 字节, 小端序
pub fn md5_of(samples: &[i32], bits_per_sample: u32) -> [u8; 16] {
    let width = bits_per_sample.div_ceil(8) as usize;
    let bytes: Vec<u8> = samples
        .iter()
        .flat_map(|s| s.to_le_bytes()[..width].to_vec())
        .collect();
    md5::compute(bytes).0
}

/// 确定性伪随机信号, 幅度限制在 `bits` 位有符号范围内
pub fn noise(len: usize, bits: u32, seed: u64) -> Vec<i32> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let half = 1i64 << (bits - 1);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let value = (state >> 33) as i64 % (2 * half) - half;
            value as i32
        })
        .collect()
}

/// 平滑的三角波, 便于预测编码
pub fn triangle(len: usize, amplitude: i32, period: usize, phase: usize) -> Vec<i32> {
    let period = period.max(4);
    let quarter = period / 4;
    (0..len)
        .map(|i| {
            let p = (i + phase) % period;
            let step = i64::from(amplitude) / quarter as i64;
            let v = if p < quarter {
                step * p as i64
            } else if p < 3 * quarter {
                step * (2 * quarter as i64 - p as i64)
            } else {
                step * (p as i64 - 4 * quarter as i64)
            };
            v as i32
        })
        .collect()
}

fn encode_frame(
    index: u64,
    sample_rate: u32,
    bits_per_sample: u32,
    options: &FrameOptions,
    channels: &[Vec<i32>],
) -> Vec<u8> {
    let block_size = channels[0].len() as u32;
    let mut header = BitWriter::new();
    header.write_bits(0b11_1111_1111_1110, 14);
    header.write_bits(0, 2);

    let (bs_code, bs_ext) = if block_size <= 256 {
        (6, Some((block_size - 1, 8)))
    } else {
        (7, Some((block_size - 1, 16)))
    };
    let (sr_code, sr_ext) = if options.explicit_header {
        sample_rate_code(sample_rate)
    } else {
        (0, None)
    };
    let ch_code = match options.stereo {
        StereoMode::Independent => channels.len() as u32 - 1,
        StereoMode::LeftSide => 8,
        StereoMode::RightSide => 9,
        StereoMode::MidSide => 10,
    };
    let ss_code = if options.explicit_header {
        match bits_per_sample {
            8 => 1,
            12 => 2,
            16 => 4,
            20 => 5,
            24 => 6,
            32 => 7,
            _ => 0,
        }
    } else {
        0
    };

    header.write_bits(bs_code, 4);
    header.write_bits(sr_code, 4);
    header.write_bits(ch_code, 4);
    header.write_bits(ss_code, 3);
    header.write_bit(0);
    header.write_utf8_u64(index);
    for (value, bits) in [bs_ext, sr_ext].into_iter().flatten() {
        header.write_bits(value, bits);
    }
    let mut frame = header.finish();
    frame.push(crc::crc8(&frame));

    let coded = decorrelate(options.stereo, channels);
    let mut body = BitWriter::new();
    for (ch, samples) in coded.iter().enumerate() {
        let side = match options.stereo {
            StereoMode::LeftSide | StereoMode::MidSide => ch == 1,
            StereoMode::RightSide => ch == 0,
            StereoMode::Independent => false,
        };
        let bps = bits_per_sample + u32::from(side);
        encode_subframe(&mut body, &options.subframe, samples, bps);
    }
    frame.extend_from_slice(&body.finish());

    let crc = crc::crc16(&frame);
    frame.extend_from_slice(&crc.to_be_bytes());
    frame
}

fn sample_rate_code(rate: u32) -> (u32, Option<(u32, u32)>) {
    let table = [
        (88200, 1),
        (176400, 2),
        (192000, 3),
        (8000, 4),
        (16000, 5),
        (22050, 6),
        (24000, 7),
        (32000, 8),
        (44100, 9),
        (48000, 10),
        (96000, 11),
    ];
    if let Some(&(_, code)) = table.iter().find(|(r, _)| *r == rate) {
        return (code, None);
    }
    if rate % 1000 == 0 && rate / 1000 < 256 {
        (12, Some((rate / 1000, 8)))
    } else if rate < 65536 {
        (13, Some((rate, 16)))
    } else {
        (14, Some((rate / 10, 16)))
    }
}

fn decorrelate(stereo: StereoMode, channels: &[Vec<i32>]) -> Vec<Vec<i32>> {
    if stereo == StereoMode::Independent {
        return channels.to_vec();
    }
    let (left, right) = (&channels[0], &channels[1]);
    let side: Vec<i32> = left.iter().zip(right).map(|(&l, &r)| l - r).collect();
    match stereo {
        StereoMode::LeftSide => vec![left.clone(), side],
        StereoMode::RightSide => vec![side, right.clone()],
        _ => {
            let mid = left
                .iter()
                .zip(right)
                .map(|(&l, &r)| ((i64::from(l) + i64::from(r)) >> 1) as i32)
                .collect();
            vec![mid, side]
        }
    }
}

fn encode_subframe(bw: &mut BitWriter, kind: &SubframeKind, samples: &[i32], bps: u32) {
    bw.write_bit(0);
    match kind {
        SubframeKind::Constant => {
            assert!(samples.iter().all(|&s| s == samples[0]), "Constant 子帧要求采样相同");
            bw.write_bits(0, 6);
            bw.write_bit(0);
            bw.write_bits_signed(samples[0], bps);
        }
        SubframeKind::Verbatim => {
            bw.write_bits(1, 6);
            bw.write_bit(0);
            for &s in samples {
                bw.write_bits_signed(s, bps);
            }
        }
        SubframeKind::Fixed(order) => {
            let order = *order;
            bw.write_bits(8 + order as u32, 6);
            bw.write_bit(0);
            for &s in &samples[..order] {
                bw.write_bits_signed(s, bps);
            }
            let residual: Vec<i64> = (order..samples.len())
                .map(|i| {
                    let s = |back: usize| i64::from(samples[i - back]);
                    let predicted = match order {
                        0 => 0,
                        1 => s(1),
                        2 => 2 * s(1) - s(2),
                        3 => 3 * s(1) - 3 * s(2) + s(3),
                        _ => 4 * s(1) - 6 * s(2) + 4 * s(3) - s(4),
                    };
                    i64::from(samples[i]) - predicted
                })
                .collect();
            encode_residual(bw, &residual, samples.len(), order);
        }
        SubframeKind::Lpc {
            coefficients,
            precision,
            shift,
        } => {
            let order = coefficients.len();
            bw.write_bits(31 + order as u32, 6);
            bw.write_bit(0);
            for &s in &samples[..order] {
                bw.write_bits_signed(s, bps);
            }
            bw.write_bits(precision - 1, 4);
            bw.write_bits_signed(*shift as i32, 5);
            for &c in coefficients {
                bw.write_bits_signed(c, *precision);
            }
            let residual: Vec<i64> = (order..samples.len())
                .map(|i| {
                    let predicted: i64 = coefficients
                        .iter()
                        .enumerate()
                        .map(|(j, &c)| i64::from(c) * i64::from(samples[i - 1 - j]))
                        .sum();
                    i64::from(samples[i]) - (predicted >> shift)
                })
                .collect();
            encode_residual(bw, &residual, samples.len(), order);
        }
    }
}

/// Rice 残差编码: 自动选择分区阶数和参数, 全零分区使用 0 位逃逸编码
fn encode_residual(bw: &mut BitWriter, residual: &[i64], block_size: usize, order: usize) {
    let partition_order = (0..=3u32)
        .rev()
        .find(|&po| block_size % (1 << po) == 0 && (block_size >> po) >= order.max(1))
        .unwrap_or(0);
    let partition_len = block_size >> partition_order;

    let fold = |r: i64| ((r << 1) ^ (r >> 63)) as u64;
    let mut partitions = Vec::new();
    let mut start = 0;
    for p in 0..(1usize << partition_order) {
        let count = if p == 0 { partition_len - order } else { partition_len };
        partitions.push(&residual[start..start + count]);
        start += count;
    }

    let params: Vec<Option<u32>> = partitions
        .iter()
        .map(|part| {
            if part.iter().all(|&r| r == 0) {
                return None;
            }
            let mean = part.iter().map(|&r| fold(r)).sum::<u64>() / part.len().max(1) as u64;
            Some((64 - mean.leading_zeros()).min(30))
        })
        .collect();
    let rice2 = params.iter().flatten().any(|&k| k > 14);
    let (param_bits, escape) = if rice2 { (5, 31) } else { (4, 15) };

    bw.write_bits(u32::from(rice2), 2);
    bw.write_bits(partition_order, 4);
    for (part, param) in partitions.iter().zip(&params) {
        match param {
            None => {
                bw.write_bits(escape, param_bits);
                bw.write_bits(0, 5);
            }
            Some(k) => {
                bw.write_bits(*k, param_bits);
                for &r in part.iter() {
                    let u = fold(r);
                    bw.write_unary((u >> k) as u32, 1);
                    bw.write_bits_u64(u & ((1u64 << k) - 1), *k);
                }
            }
        }
    }
}
