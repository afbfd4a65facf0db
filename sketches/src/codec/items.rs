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

//! Encoding of the items carried by item sketches (frequent items, samplers).

use std::str;

use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::error::Error;

/// Serializer/deserializer for items stored in an item sketch.
pub trait ItemsSerde<T> {
    /// Appends the encoding of `items` to `out`.
    fn serialize_items(&self, items: &[T], out: &mut Vec<u8>);

    /// Decodes `num_items` from the front of `bytes`, returning items and bytes consumed.
    fn deserialize_items(&self, bytes: &[u8], num_items: usize) -> Result<(Vec<T>, usize), Error>;
}

/// Length-prefixed UTF-8 strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringSerde;

impl ItemsSerde<String> for StringSerde {
    fn serialize_items(&self, items: &[String], out: &mut Vec<u8>) {
        let mut bytes = SketchBytes::with_capacity(items.iter().map(|s| 4 + s.len()).sum());
        for item in items {
            bytes.write_u32_le(item.len() as u32);
            bytes.write(item.as_bytes());
        }
        out.extend_from_slice(&bytes.into_bytes());
    }

    fn deserialize_items(
        &self,
        bytes: &[u8],
        num_items: usize,
    ) -> Result<(Vec<String>, usize), Error> {
        let mut cursor = SketchSlice::new(bytes);
        let mut items = Vec::with_capacity(num_items.min(bytes.len() / 4));
        let mut consumed = 0usize;
        for _ in 0..num_items {
            let len = cursor
                .read_u32_le()
                .map_err(|_| Error::insufficient_data("string_length"))?
                as usize;
            let payload = cursor.remaining();
            if payload.len() < len {
                return Err(Error::insufficient_data("string_payload"));
            }
            let value = str::from_utf8(&payload[..len])
                .map_err(|err| Error::deserial("invalid UTF-8 string payload").set_source(err))?;
            items.push(value.to_string());
            cursor.advance(len);
            consumed += 4 + len;
        }
        Ok((items, consumed))
    }
}

/// Fixed-width little-endian `i64` items.
#[derive(Debug, Default, Clone, Copy)]
pub struct I64Serde;

impl ItemsSerde<i64> for I64Serde {
    fn serialize_items(&self, items: &[i64], out: &mut Vec<u8>) {
        let mut bytes = SketchBytes::with_capacity(items.len() * 8);
        for item in items {
            bytes.write_i64_le(*item);
        }
        out.extend_from_slice(&bytes.into_bytes());
    }

    fn deserialize_items(&self, bytes: &[u8], num_items: usize) -> Result<(Vec<i64>, usize), Error> {
        let needed = num_items
            .checked_mul(8)
            .ok_or_else(|| Error::deserial("items size overflow"))?;
        if bytes.len() < needed {
            return Err(Error::insufficient_data("i64_items"));
        }
        let mut cursor = SketchSlice::new(bytes);
        let mut items = Vec::with_capacity(num_items);
        for _ in 0..num_items {
            items.push(
                cursor
                    .read_i64_le()
                    .map_err(|_| Error::insufficient_data("i64_items"))?,
            );
        }
        Ok((items, needed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings_consume_exact_prefix() {
        let mut out = Vec::new();
        StringSerde.serialize_items(&["a".to_string(), "".to_string(), "xyz".to_string()], &mut out);
        out.push(0xAA);
        let (items, consumed) = StringSerde.deserialize_items(&out, 3).unwrap();
        assert_eq!(items, vec!["a", "", "xyz"]);
        assert_eq!(consumed, out.len() - 1);
    }

    #[test]
    fn test_truncated_string_payload() {
        let mut out = Vec::new();
        StringSerde.serialize_items(&["hello".to_string()], &mut out);
        out.truncate(6);
        assert!(StringSerde.deserialize_items(&out, 1).is_err());
    }

    #[test]
    fn test_i64_items() {
        let mut out = Vec::new();
        I64Serde.serialize_items(&[1, -2, i64::MAX], &mut out);
        assert_eq!(out.len(), 24);
        let (items, consumed) = I64Serde.deserialize_items(&out, 3).unwrap();
        assert_eq!(items, vec![1, -2, i64::MAX]);
        assert_eq!(consumed, 24);
        assert!(I64Serde.deserialize_items(&out, 4).is_err());
    }
}
