//! Bulk moves of 32-bit values between host slices and buffer memory.
//!
//! Buffer memory is little-endian and carries no alignment guarantee for an
//! arbitrary byte offset, so every path uses unaligned loads and stores. Each
//! routine moves as many whole lanes as fit and returns the number of values it
//! handled; the remaining tail is left to the caller's scalar loop.
//!
//! Paths:
//! - x86_64: AVX2 (8 lanes) when detected at runtime, otherwise SSE2 (4 lanes).
//! - aarch64 (little-endian): NEON (4 lanes).
//! - elsewhere: a 4-lane byte copy on little-endian targets, nothing on big-endian ones.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

#[cfg(all(target_arch = "aarch64", target_endian = "little"))]
use std::arch::aarch64::*;

/// The number of 32-bit values moved per step on this machine.
pub fn lane_width() -> usize {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            return 8;
        }
    }
    4
}

/// Stores whole lanes of `src` to `dst` as little-endian words.
///
/// # Safety
///
/// `dst` must be valid for writes of `4 * src.len()` bytes and must not overlap `src`.
#[cfg(target_arch = "x86_64")]
pub(crate) unsafe fn store_i32(dst: *mut u8, src: &[i32]) -> usize {
    if is_x86_feature_detected!("avx2") {
        store_i32_avx2(dst, src)
    } else {
        store_i32_sse2(dst, src)
    }
}

/// Loads whole lanes of little-endian words from `src` into `dst`.
///
/// # Safety
///
/// `src` must be valid for reads of `4 * dst.len()` bytes and must not overlap `dst`.
#[cfg(target_arch = "x86_64")]
pub(crate) unsafe fn load_i32(src: *const u8, dst: &mut [i32]) -> usize {
    if is_x86_feature_detected!("avx2") {
        load_i32_avx2(src, dst)
    } else {
        load_i32_sse2(src, dst)
    }
}

#[cfg(all(target_arch = "aarch64", target_endian = "little"))]
pub(crate) unsafe fn store_i32(dst: *mut u8, src: &[i32]) -> usize {
    store_i32_neon(dst, src)
}

#[cfg(all(target_arch = "aarch64", target_endian = "little"))]
pub(crate) unsafe fn load_i32(src: *const u8, dst: &mut [i32]) -> usize {
    load_i32_neon(src, dst)
}

#[cfg(not(any(target_arch = "x86_64", all(target_arch = "aarch64", target_endian = "little"))))]
pub(crate) unsafe fn store_i32(dst: *mut u8, src: &[i32]) -> usize {
    store_i32_portable(dst, src)
}

#[cfg(not(any(target_arch = "x86_64", all(target_arch = "aarch64", target_endian = "little"))))]
pub(crate) unsafe fn load_i32(src: *const u8, dst: &mut [i32]) -> usize {
    load_i32_portable(src, dst)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn store_i32_avx2(dst: *mut u8, src: &[i32]) -> usize {
    let lanes = src.len() / 8 * 8;
    let mut i = 0;
    while i < lanes {
        let v = _mm256_loadu_si256(src.as_ptr().add(i) as *const __m256i);
        _mm256_storeu_si256(dst.add(i * 4) as *mut __m256i, v);
        i += 8;
    }
    lanes
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn load_i32_avx2(src: *const u8, dst: &mut [i32]) -> usize {
    let lanes = dst.len() / 8 * 8;
    let mut i = 0;
    while i < lanes {
        let v = _mm256_loadu_si256(src.add(i * 4) as *const __m256i);
        _mm256_storeu_si256(dst.as_mut_ptr().add(i) as *mut __m256i, v);
        i += 8;
    }
    lanes
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn store_i32_sse2(dst: *mut u8, src: &[i32]) -> usize {
    let lanes = src.len() / 4 * 4;
    let mut i = 0;
    while i < lanes {
        let v = _mm_loadu_si128(src.as_ptr().add(i) as *const __m128i);
        _mm_storeu_si128(dst.add(i * 4) as *mut __m128i, v);
        i += 4;
    }
    lanes
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn load_i32_sse2(src: *const u8, dst: &mut [i32]) -> usize {
    let lanes = dst.len() / 4 * 4;
    let mut i = 0;
    while i < lanes {
        let v = _mm_loadu_si128(src.add(i * 4) as *const __m128i);
        _mm_storeu_si128(dst.as_mut_ptr().add(i) as *mut __m128i, v);
        i += 4;
    }
    lanes
}

#[cfg(all(target_arch = "aarch64", target_endian = "little"))]
#[target_feature(enable = "neon")]
unsafe fn store_i32_neon(dst: *mut u8, src: &[i32]) -> usize {
    let lanes = src.len() / 4 * 4;
    let mut i = 0;
    while i < lanes {
        let v = vld1q_s32(src.as_ptr().add(i));
        vst1q_u8(dst.add(i * 4), vreinterpretq_u8_s32(v));
        i += 4;
    }
    lanes
}

#[cfg(all(target_arch = "aarch64", target_endian = "little"))]
#[target_feature(enable = "neon")]
unsafe fn load_i32_neon(src: *const u8, dst: &mut [i32]) -> usize {
    let lanes = dst.len() / 4 * 4;
    let mut i = 0;
    while i < lanes {
        let v = vreinterpretq_s32_u8(vld1q_u8(src.add(i * 4)));
        vst1q_s32(dst.as_mut_ptr().add(i), v);
        i += 4;
    }
    lanes
}

/// Four values at a time as raw bytes; only correct where host order is little-endian.
#[cfg_attr(any(target_arch = "x86_64", all(target_arch = "aarch64", target_endian = "little")), allow(dead_code))]
unsafe fn store_i32_portable(dst: *mut u8, src: &[i32]) -> usize {
    if cfg!(target_endian = "big") {
        return 0;
    }
    let lanes = src.len() / 4 * 4;
    let bytes: &[u8] = bytemuck::cast_slice(&src[.. lanes]);
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
    lanes
}

#[cfg_attr(any(target_arch = "x86_64", all(target_arch = "aarch64", target_endian = "little")), allow(dead_code))]
unsafe fn load_i32_portable(src: *const u8, dst: &mut [i32]) -> usize {
    if cfg!(target_endian = "big") {
        return 0;
    }
    let lanes = dst.len() / 4 * 4;
    let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut dst[.. lanes]);
    std::ptr::copy_nonoverlapping(src, bytes.as_mut_ptr(), bytes.len());
    lanes
}
