// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Little-endian byte writer and reader shared by every sketch format.

use std::io;
use std::io::Cursor;
use std::io::Read;

use byteorder::LittleEndian;
use byteorder::ReadBytesExt;

mod family;
mod items;

pub use self::family::Family;
pub use self::items::I64Serde;
pub use self::items::ItemsSerde;
pub use self::items::StringSerde;

pub(crate) struct SketchBytes {
    bytes: Vec<u8>,
}

impl SketchBytes {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write(&mut self, buf: &[u8]) {
        self.bytes.extend_from_slice(buf);
    }

    pub fn write_u8(&mut self, n: u8) {
        self.bytes.push(n);
    }

    pub fn write_u16_le(&mut self, n: u16) {
        self.write(&n.to_le_bytes());
    }

    pub fn write_u32_le(&mut self, n: u32) {
        self.write(&n.to_le_bytes());
    }

    pub fn write_u64_le(&mut self, n: u64) {
        self.write(&n.to_le_bytes());
    }

    pub fn write_i64_le(&mut self, n: i64) {
        self.write(&n.to_le_bytes());
    }

    pub fn write_f64_le(&mut self, n: f64) {
        self.write(&n.to_le_bytes());
    }
}

pub(crate) struct SketchSlice<'a> {
    slice: Cursor<&'a [u8]>,
}

impl<'a> SketchSlice<'a> {
    pub fn new(slice: &'a [u8]) -> SketchSlice<'a> {
        SketchSlice {
            slice: Cursor::new(slice),
        }
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.slice.read_exact(buf)
    }

    /// Bytes that have not been consumed yet.
    pub fn remaining(&self) -> &'a [u8] {
        let data: &'a [u8] = *self.slice.get_ref();
        let pos = (self.slice.position() as usize).min(data.len());
        &data[pos..]
    }

    pub fn advance(&mut self, n: usize) {
        let pos = self.slice.position();
        self.slice.set_position(pos + n as u64);
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        self.slice.read_u8()
    }

    pub fn read_u16_le(&mut self) -> io::Result<u16> {
        self.slice.read_u16::<LittleEndian>()
    }

    pub fn read_u32_le(&mut self) -> io::Result<u32> {
        self.slice.read_u32::<LittleEndian>()
    }

    pub fn read_u64_le(&mut self) -> io::Result<u64> {
        self.slice.read_u64::<LittleEndian>()
    }

    pub fn read_i64_le(&mut self) -> io::Result<i64> {
        self.slice.read_i64::<LittleEndian>()
    }

    pub fn read_f64_le(&mut self) -> io::Result<f64> {
        self.slice.read_f64::<LittleEndian>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_mixed_widths() {
        let mut bytes = SketchBytes::with_capacity(32);
        bytes.write_u8(7);
        bytes.write_u16_le(0xBEEF);
        bytes.write_u32_le(42);
        bytes.write_i64_le(-5);
        bytes.write_f64_le(0.25);
        let bytes = bytes.into_bytes();
        assert_eq!(bytes.len(), 1 + 2 + 4 + 8 + 8);
        assert_eq!(&bytes[1..3], &[0xEF, 0xBE]);

        let mut slice = SketchSlice::new(&bytes);
        assert_eq!(slice.read_u8().unwrap(), 7);
        assert_eq!(slice.read_u16_le().unwrap(), 0xBEEF);
        assert_eq!(slice.read_u32_le().unwrap(), 42);
        assert_eq!(slice.read_i64_le().unwrap(), -5);
        assert_eq!(slice.read_f64_le().unwrap(), 0.25);
        assert!(slice.remaining().is_empty());
        assert!(slice.read_u8().is_err());
    }

    #[test]
    fn test_remaining_and_advance() {
        let data = [1u8, 2, 3, 4, 5];
        let mut slice = SketchSlice::new(&data);
        assert_eq!(slice.read_u8().unwrap(), 1);
        assert_eq!(slice.remaining(), &[2, 3, 4, 5]);
        slice.advance(3);
        assert_eq!(slice.remaining(), &[5]);
    }
}
