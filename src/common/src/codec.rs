// Copyright 2025 RisingWave Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Compression applied to serialized plan and option blobs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FragmentCodec {
    #[default]
    None,
    Snappy,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("snappy compression failed")]
    Compress(#[source] snap::Error),
    #[error("snappy decompression failed")]
    Decompress(#[source] snap::Error),
}

impl FragmentCodec {
    pub fn encode(&self, raw: &[u8]) -> Result<Bytes, CodecError> {
        match self {
            Self::None => Ok(Bytes::copy_from_slice(raw)),
            Self::Snappy => snap::raw::Encoder::new()
                .compress_vec(raw)
                .map(Bytes::from)
                .map_err(CodecError::Compress),
        }
    }

    pub fn decode(&self, blob: &[u8]) -> Result<Bytes, CodecError> {
        match self {
            Self::None => Ok(Bytes::copy_from_slice(blob)),
            Self::Snappy => snap::raw::Decoder::new()
                .decompress_vec(blob)
                .map(Bytes::from)
                .map_err(CodecError::Decompress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &[u8] = br#"{"id":0,"body":"Root","children":[]}"#;

    #[test]
    fn test_round_trip_all_codecs() {
        for codec in [FragmentCodec::None, FragmentCodec::Snappy] {
            let blob = codec.encode(PAYLOAD).unwrap();
            assert_eq!(codec.decode(&blob).unwrap(), Bytes::from_static(PAYLOAD));
        }
    }

    #[test]
    fn test_snappy_actually_transforms() {
        let blob = FragmentCodec::Snappy.encode(PAYLOAD).unwrap();
        assert_ne!(blob, Bytes::from_static(PAYLOAD));
    }

    #[test]
    fn test_garbage_fails_snappy_decode() {
        let err = FragmentCodec::Snappy.decode(b"\xff\xff\xff").unwrap_err();
        assert!(matches!(err, CodecError::Decompress(_)));
    }
}
