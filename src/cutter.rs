// Copyright 2025 Dustin McAfee
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


//! Median-cut box subdivision over the quantized color lattice.
//!
//! Starting from the bounding box of all occupied cells, the cutter
//! repeatedly splits the most populous box at the midpoint of whichever
//! axis separates the two halves' centroids best, until the box list
//! reaches the palette limit or no box can be split further. The working
//! list is kept sorted by descending pixel frequency so the split candidate
//! is always the heaviest box not yet proven unsplittable.
//!
//! Axis scoring uses a population-weighted squared centroid distance; ties
//! keep the earlier axis in Y, U, V order, which makes palette construction
//! fully deterministic.

use crate::histogram::{ColorBox, Histogram};

/// A candidate palette region: a cell box plus its pixel population.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Bucket {
    /// The lattice cells this bucket owns.
    pub cells: ColorBox,
    /// Pixel count inside the box.
    pub frequency: u32,
}

/// Subdivides the occupied color volume into at most `max_colors` disjoint
/// boxes, replacing the contents of `buckets`.
///
/// `histogram` must already hold prefix sums. The resulting list is sorted
/// by descending frequency and covers every occupied cell. An empty
/// histogram produces an empty list.
pub(crate) fn cut(histogram: &Histogram, buckets: &mut Vec<Bucket>, max_colors: usize) {
    buckets.clear();
    if histogram.pixel_count() == 0 {
        return;
    }

    let cells = histogram.bounding_box();
    buckets.push(Bucket {
        cells,
        frequency: histogram.box_count(&cells),
    });

    let mut candidate = 0;
    while candidate < buckets.len() && buckets.len() < max_colors {
        match split(histogram, &buckets[candidate]) {
            Some((lower, upper)) => {
                buckets[candidate] = lower;
                buckets.push(upper);
                let tail = buckets.len() - 1;
                sink_candidate(buckets, candidate);
                float_tail(buckets, candidate, tail);
            }
            None => candidate += 1,
        }
    }
}

/// Attempts to split a bucket at the midpoint of its best axis.
///
/// Returns `None` when the box is a single cell on every axis worth
/// splitting. During scoring both candidate halves share the midpoint cell;
/// the emitted boxes partition cleanly at `mid` / `mid + 1`.
fn split(histogram: &Histogram, bucket: &Bucket) -> Option<(Bucket, Bucket)> {
    let cells = bucket.cells;
    let (count, sum) = histogram.box_sum(&cells);
    let parent = centroid(count, sum);

    let mut best_axis = 0;
    let mut best_score = 0;
    let mut best_range = (0u8, 0u8);

    for axis in 0..3 {
        let mid = (cells.start[axis] as u16 + cells.end[axis] as u16) >> 1;

        let mut lower = cells;
        lower.end[axis] = mid as u8;
        let (count0, sum0) = histogram.box_sum(&lower);
        let centroid0 = centroid(count0, sum0);

        let mut upper = cells;
        upper.start[axis] = mid as u8;
        let (count1, sum1) = histogram.box_sum(&upper);
        let centroid1 = centroid(count1, sum1);

        let score = weighted_distance(count0, centroid0, count1, centroid1, parent);
        if axis == 0 || best_score < score {
            best_score = score;
            best_axis = axis;
            best_range = (cells.start[axis], cells.end[axis]);
        }
    }

    let (start, end) = best_range;
    if start == end {
        return None;
    }

    let split0 = ((start as u16 + end as u16) >> 1) as u8;
    let split1 = split0 + 1;

    let mut lower = cells;
    lower.end[best_axis] = split0;
    let mut upper = cells;
    upper.start[best_axis] = split1;

    Some((
        Bucket {
            cells: lower,
            frequency: histogram.box_count(&lower),
        },
        Bucket {
            cells: upper,
            frequency: histogram.box_count(&upper),
        },
    ))
}

/// Mean channel values of a box, zero for an empty box.
fn centroid(count: u32, sum: [u32; 3]) -> [u32; 3] {
    if count == 0 {
        return [0; 3];
    }
    [sum[0] / count, sum[1] / count, sum[2] / count]
}

/// Population-weighted squared distance of the two half centroids from the
/// parent centroid: `(n0 * d0^2 + n1 * d1^2) / (n0 + n1)`.
fn weighted_distance(
    count0: u32,
    centroid0: [u32; 3],
    count1: u32,
    centroid1: [u32; 3],
    parent: [u32; 3],
) -> u64 {
    if count0 == 0 && count1 == 0 {
        return 0;
    }
    let total = count0 as u64 + count1 as u64;
    let d0 = squared_distance(centroid0, parent);
    let d1 = squared_distance(centroid1, parent);
    (d0 * count0 as u64 + d1 * count1 as u64) / total
}

#[inline]
fn squared_distance(a: [u32; 3], b: [u32; 3]) -> u64 {
    (0..3)
        .map(|i| {
            let d = a[i] as i64 - b[i] as i64;
            (d * d) as u64
        })
        .sum()
}

/// One forward pass restoring descending order after the candidate slot was
/// replaced by its lighter lower half.
fn sink_candidate(buckets: &mut [Bucket], index: usize) {
    for i in index + 1..buckets.len() {
        if buckets[i].frequency <= buckets[i - 1].frequency {
            return;
        }
        buckets.swap(i, i - 1);
    }
}

/// One backward pass floating the freshly appended tail toward its slot.
fn float_tail(buckets: &mut [Bucket], start: usize, index: usize) {
    let mut i = index;
    while start < i {
        if buckets[i].frequency <= buckets[i - 1].frequency {
            return;
        }
        buckets.swap(i, i - 1);
        i -= 1;
    }
}
