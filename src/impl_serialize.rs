use std::fmt;

use serde::de::{Deserialize, Deserializer, Error as _, MapAccess, Visitor};
use serde::ser::{Error as _, Serialize, SerializeSeq, SerializeStruct, Serializer};

use crate::cube::{Cube, Hypercube};
use crate::element::Element;
use crate::storage::ArrayCube;

/// Number of elements read from the cube per bulk transfer.
const BUF_LEN: usize = 1024;

struct CubeData<'a, T: Element> {
    cube: &'a dyn Hypercube<T>,
}

impl<T> Serialize for CubeData<'_, T>
where
    T: Element + Serialize,
{
    fn serialize<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        Sr: Serializer,
    {
        let size = usize::try_from(self.cube.size()).map_err(Sr::Error::custom)?;
        let mut seq = serializer.serialize_seq(Some(size))?;
        let mut buf = vec![T::NULL; size.min(BUF_LEN)];
        let mut pos = 0;
        while pos < size {
            let len = (size - pos).min(BUF_LEN);
            self.cube
                .to_flattened(pos as u64, &mut buf[..len])
                .map_err(Sr::Error::custom)?;
            for el in &buf[..len] {
                seq.serialize_element(el)?;
            }
            pos += len;
        }
        seq.end()
    }
}

fn serialize_cube<T, Sr>(cube: &dyn Hypercube<T>, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
where
    T: Element + Serialize,
    Sr: Serializer,
{
    let mut state = serializer.serialize_struct("Cube", 2)?;
    state.serialize_field("shape", cube.shape())?;
    state.serialize_field("data", &CubeData { cube })?;
    state.end()
}

impl<T> Serialize for ArrayCube<T>
where
    T: Element + Serialize,
{
    fn serialize<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        Sr: Serializer,
    {
        serialize_cube(self, serializer)
    }
}

/// Cubes of any kind serialize to the same form as an [`ArrayCube`] holding
/// their elements.
impl<T> Serialize for Cube<T>
where
    T: Element + Serialize,
{
    fn serialize<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        Sr: Serializer,
    {
        serialize_cube(&**self, serializer)
    }
}

struct ArrayCubeVisitor<T> {
    marker: std::marker::PhantomData<T>,
}

impl<'de, T> Visitor<'de> for ArrayCubeVisitor<T>
where
    T: Element + Deserialize<'de>,
{
    type Value = ArrayCube<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a cube with \"shape\" and \"data\" fields")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut data: Option<Vec<T>> = None;
        let mut shape: Option<Vec<u64>> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "data" => {
                    if data.is_some() {
                        return Err(A::Error::duplicate_field("data"));
                    }
                    data = Some(map.next_value()?);
                }
                "shape" => {
                    if shape.is_some() {
                        return Err(A::Error::duplicate_field("shape"));
                    }
                    shape = Some(map.next_value()?);
                }
                _ => {
                    return Err(A::Error::unknown_field(&key, &["data", "shape"]));
                }
            }
        }

        let Some(shape) = shape else {
            return Err(A::Error::missing_field("shape"));
        };
        let Some(data) = data else {
            return Err(A::Error::missing_field("data"));
        };

        ArrayCube::from_vec(&shape, data)
            .map_err(|_| A::Error::custom("data length does not match shape product"))
    }
}

impl<'de, T> Deserialize<'de> for ArrayCube<T>
where
    T: Element + Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<ArrayCube<T>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_struct(
            "Cube",
            &["shape", "data"],
            ArrayCubeVisitor::<T> {
                marker: std::marker::PhantomData,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::cube::{Cube, Hypercube};
    use crate::storage::ArrayCube;

    #[test]
    fn test_deserialize_serialize() {
        struct Case<'a> {
            json: &'a str,
            expected: Result<(Vec<u64>, Vec<f32>), String>,
        }

        let cases = [
            Case {
                json: "[]",
                expected: Err("expected a cube with \"shape\" and \"data\" fields".to_string()),
            },
            Case {
                json: r#"{"data":[]}"#,
                expected: Err("missing field `shape`".to_string()),
            },
            Case {
                json: r#"{"data":[], "data": []}"#,
                expected: Err("duplicate field `data`".to_string()),
            },
            Case {
                json: r#"{"shape":[]}"#,
                expected: Err("missing field `data`".to_string()),
            },
            Case {
                json: r#"{"shape":[1], "data":[1.0], "strides":[1]}"#,
                expected: Err("unknown field `strides`".to_string()),
            },
            Case {
                json: r#"{"data": [1.0, 0.5, 2.0, 1.5], "shape": [2, 2]}"#,
                expected: Ok((vec![2, 2], vec![1.0, 0.5, 2.0, 1.5])),
            },
            Case {
                json: r#"{"data": [1.0, 0.5, 2.0, 1.5], "shape": [2, 3]}"#,
                expected: Err("data length does not match shape product".to_string()),
            },
        ];

        for Case { json, expected } in cases {
            let actual: Result<ArrayCube<f32>, String> =
                serde_json::from_str(json).map_err(|e| e.to_string());
            match (actual, expected) {
                (Ok(actual), Ok((shape, data))) => {
                    assert_eq!(actual.shape(), shape);

                    // Serializing the result produces the original JSON.
                    let actual_json = serde_json::to_value(&actual).unwrap();
                    let expected_json: serde_json::Value = serde_json::from_str(json).unwrap();
                    assert_eq!(actual_json, expected_json);

                    assert_eq!(actual.into_vec(), data);
                }
                (Err(actual_err), Err(expected_err)) => assert!(
                    actual_err.contains(&expected_err),
                    "expected \"{}\" to contain \"{}\"",
                    actual_err,
                    expected_err
                ),
                (Ok(_), Err(expected_err)) => panic!("expected error \"{}\"", expected_err),
                (Err(actual_err), Ok(_)) => panic!("unexpected error \"{}\"", actual_err),
            }
        }
    }

    #[test]
    fn test_nan_is_not_representable_in_json() {
        let cube = ArrayCube::<f64>::new(&[2]);
        let json = serde_json::to_value(&cube).unwrap();
        assert_eq!(json, serde_json::json!({"shape": [2], "data": [null, null]}));

        let result: Result<ArrayCube<f64>, _> = serde_json::from_value(json);
        assert!(result.is_err());

        // Cubes without NaN round-trip.
        let cube = ArrayCube::<f64>::from_vec(&[2], vec![0., -1.5]).unwrap();
        let json = serde_json::to_string(&cube).unwrap();
        let parsed: ArrayCube<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.into_vec(), [0., -1.5]);
    }

    #[test]
    fn test_serialize_view() {
        let data: Vec<i32> = (0..2000).collect();
        let cube = Cube::new(ArrayCube::from_vec(&[40, 50], data).unwrap());
        let view = cube.transpose().slice((..2, ..3)).unwrap();

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"shape": [2, 3], "data": [0, 50, 100, 1, 51, 101]})
        );

        // Views larger than the staging buffer.
        let json = serde_json::to_string(&cube.roll_flat(1)).unwrap();
        let array: ArrayCube<i32> = serde_json::from_str(&json).unwrap();
        let values = array.into_vec();
        assert_eq!(values[0], 1999);
        assert_eq!(values[1999], 1998);
    }
}
