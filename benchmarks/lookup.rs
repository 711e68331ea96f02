//! Benchmarks table lookups over rasters of different layouts.
use brunch::Bench;

use image_raster::{factory, DataType, LookupTable, Raster, RasterError, SampleLayout};

struct Lookup {
    layout: fn(DataType, usize) -> Result<SampleLayout, RasterError>,
    name: &'static str,
    data_type: DataType,
    table_bands: usize,
    sz: usize,
}

impl Lookup {
    fn name(&self) -> String {
        format!(
            "lookup({}, {}, {} table bands, {})",
            self.name, self.data_type, self.table_bands, self.sz
        )
    }

    fn prepare(self) -> Result<impl FnMut(), RasterError> {
        let layout = (self.layout)(self.data_type, self.sz)?;
        let raster = Raster::create_writable(layout, (0, 0));
        let table = LookupTable::new(vec![(0..=255u8).collect::<Vec<_>>(); self.table_bands], 0)?;
        Ok(move || {
            table.lookup_raster(&raster, None).unwrap();
        })
    }
}

fn interleaved(data_type: DataType, sz: usize) -> Result<SampleLayout, RasterError> {
    factory::create_interleaved(data_type, sz, sz, 3)
}

fn banded(data_type: DataType, sz: usize) -> Result<SampleLayout, RasterError> {
    factory::create_banded(data_type, sz, sz, 3, None, None)
}

fn gray(data_type: DataType, sz: usize) -> Result<SampleLayout, RasterError> {
    factory::create_interleaved(data_type, sz, sz, 1)
}

fn main() {
    let tests = [
        Lookup {
            layout: interleaved,
            name: "interleaved",
            data_type: DataType::Byte,
            table_bands: 3,
            sz: 256,
        },
        Lookup {
            layout: banded,
            name: "banded",
            data_type: DataType::Byte,
            table_bands: 1,
            sz: 256,
        },
        Lookup {
            layout: banded,
            name: "banded",
            data_type: DataType::UShort,
            table_bands: 3,
            sz: 256,
        },
        Lookup {
            layout: gray,
            name: "gray",
            data_type: DataType::Short,
            table_bands: 3,
            sz: 256,
        },
    ];

    let mut benches = brunch::Benches::default();
    benches.extend(tests.map(|lookup| {
        Bench::new(format!("raster::lookup::main::{}", lookup.name()))
            .run(lookup.prepare().expect("Failed to setup benchmark"))
    }));
    benches.finish();
}
