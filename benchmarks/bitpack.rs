//! Benchmarks unpacking and packing of binary rasters.
use brunch::Bench;

use image_raster::binary::{pack, packed_bits, unpack};
use image_raster::{factory, DataType, Raster, RasterError};

#[derive(Clone, Copy, Debug)]
enum Direction {
    Unpack,
    Pack,
    Packed,
}

struct Convert {
    data_type: DataType,
    bit_offset: usize,
    direction: Direction,
    sz: usize,
}

impl Convert {
    fn name(&self) -> String {
        format!(
            "bitpack({:?}, {}, offset {}, {})",
            self.direction, self.data_type, self.bit_offset, self.sz
        )
    }

    fn prepare(self) -> Result<impl FnMut(), RasterError> {
        let layout = factory::create_binary(self.data_type, self.sz, self.sz, self.bit_offset)?;
        let mut raster = Raster::create_writable(layout, (0, 0));
        let bounds = raster.bounds();
        let bits = vec![1u8; self.sz * self.sz];
        let direction = self.direction;

        Ok(move || match direction {
            Direction::Unpack => {
                unpack(&raster, bounds).unwrap();
            }
            Direction::Pack => pack(&bits, &mut raster, bounds).unwrap(),
            Direction::Packed => {
                packed_bits(&raster, bounds).unwrap();
            }
        })
    }
}

fn main() {
    let tests = [
        (DataType::Byte, 0, Direction::Unpack),
        (DataType::Byte, 3, Direction::Unpack),
        (DataType::Int, 5, Direction::Unpack),
        (DataType::Byte, 3, Direction::Pack),
        (DataType::UShort, 0, Direction::Pack),
        (DataType::Byte, 0, Direction::Packed),
        (DataType::UShort, 0, Direction::Packed),
        (DataType::Int, 5, Direction::Packed),
    ]
    .map(|(data_type, bit_offset, direction)| Convert {
        data_type,
        bit_offset,
        direction,
        sz: 512,
    });

    let mut benches = brunch::Benches::default();
    benches.extend(tests.map(|convert| {
        Bench::new(format!("raster::bitpack::main::{}", convert.name()))
            .run(convert.prepare().expect("Failed to setup benchmark"))
    }));
    benches.finish();
}
