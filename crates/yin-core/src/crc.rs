//! CRC 校验和计算.
//!
//! FLAC 帧头使用 CRC-8 (多项式 0x07), 整帧使用 CRC-16 (多项式 0x8005), 初始值均为 0, 不反转.

/// CRC-8 查找表 (多项式 0x07)
const CRC8_TABLE: [u8; 256] = build_crc8_table(0x07);

/// CRC-16 查找表 (多项式 0x8005)
const CRC16_TABLE: [u16; 256] = build_crc16_table(0x8005);

const fn build_crc8_table(poly: u8) -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut j = 0;
        while j < 8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ poly } else { crc << 1 };
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

const fn build_crc16_table(poly: u16) -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut j = 0;
        while j < 8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ poly } else { crc << 1 };
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// 计算 CRC-8 (FLAC 帧头)
pub fn crc8(data: &[u8]) -> u8 {
    data.iter()
        .fold(0u8, |crc, &byte| CRC8_TABLE[(crc ^ byte) as usize])
}

/// 计算 CRC-16 (FLAC 帧尾)
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |crc, &byte| {
        (crc << 8) ^ CRC16_TABLE[((crc >> 8) as u8 ^ byte) as usize]
    })
}
