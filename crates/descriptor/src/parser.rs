use crate::{
    types::{
        ArrayType, InnerType, MethodType, ParameterizedType, Primitive, Type, TypeParameter,
        WildcardBound,
    },
    MalformedDescriptor, Result,
};

/// Parses a field descriptor, method descriptor, or generic signature.
///
/// A class signature without type parameters (`Ljava/lang/Object;Ljava/io/Serializable;`) is
/// recognised when more than one reference type follows another; a lone reference type parses as
/// that type.
pub fn parse_type(text: &str) -> Result<Type> {
    Parser::new(text).parse()
}

/// Like [`parse_type`], but returns `None` instead of failing. Useful to check whether an
/// arbitrary string constant holds a type.
pub fn try_parse_type(text: &str) -> Option<Type> {
    parse_type(text).ok()
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn parse(mut self) -> Result<Type> {
        let ty = match self.peek() {
            None => return Err(self.error("empty descriptor")),
            Some(b'(') => Type::Method(self.parse_method(Vec::new())?),
            Some(b'<') => {
                let type_parameters = self.parse_type_parameters()?;
                if self.peek() == Some(b'(') {
                    Type::Method(self.parse_method(type_parameters)?)
                } else {
                    let super_class = self.parse_class_type()?;
                    self.parse_class_signature(type_parameters, super_class)?
                }
            }
            Some(_) => {
                let ty = self.parse_field_type()?;
                match ty {
                    Type::Object(_) | Type::Parameterized(_) if !self.at_end() => {
                        self.parse_class_signature(Vec::new(), ty)?
                    }
                    ty => ty,
                }
            }
        };

        if !self.at_end() {
            return Err(self.error("unexpected trailing characters"));
        }

        Ok(ty)
    }

    fn parse_class_signature(
        &mut self,
        type_parameters: Vec<TypeParameter>,
        super_class: Type,
    ) -> Result<Type> {
        let mut interfaces = Vec::new();
        while !self.at_end() {
            interfaces.push(self.parse_class_type()?);
        }

        Ok(Type::class_signature(
            type_parameters,
            super_class,
            interfaces,
        ))
    }

    fn parse_method(&mut self, type_parameters: Vec<TypeParameter>) -> Result<MethodType> {
        self.expect(b'(', "expected '('")?;

        let mut parameters = Vec::new();
        while self.peek() != Some(b')') {
            parameters.push(self.parse_field_type()?);
        }
        self.expect(b')', "expected ')'")?;

        let return_type = self.parse_field_type()?;

        let mut exceptions = Vec::new();
        while self.eat(b'^') {
            exceptions.push(self.parse_field_type()?);
        }

        Ok(MethodType {
            type_parameters,
            parameters,
            return_type: Box::new(return_type),
            exceptions,
        })
    }

    fn parse_field_type(&mut self) -> Result<Type> {
        let Some(c) = self.peek() else {
            return Err(self.error("unexpected end of descriptor"));
        };

        if let Some(primitive) = Primitive::from_descriptor(c) {
            self.pos += 1;
            return Ok(Type::Primitive(primitive));
        }

        match c {
            b'L' => self.parse_class_type(),
            b'[' => self.parse_array_type(),
            b'T' => self.parse_type_variable(),
            _ => Err(self.error("expected a type")),
        }
    }

    fn parse_array_type(&mut self) -> Result<Type> {
        let mut dimensions: u8 = 0;
        while self.eat(b'[') {
            dimensions = dimensions
                .checked_add(1)
                .ok_or_else(|| self.error("too many array dimensions"))?;
        }

        let element_type = self.parse_field_type()?;

        Ok(Type::Array(ArrayType {
            dimensions,
            element_type: Box::new(element_type),
        }))
    }

    fn parse_type_variable(&mut self) -> Result<Type> {
        self.expect(b'T', "expected 'T'")?;
        let identifier = self.parse_identifier(b";")?;
        self.expect(b';', "missing trailing semicolon")?;

        Ok(Type::TypeVariable(identifier))
    }

    fn parse_class_type(&mut self) -> Result<Type> {
        self.expect(b'L', "expected a class type")?;
        let raw_name = self.parse_identifier(b"<;")?;

        match self.peek() {
            Some(b';') => {
                self.pos += 1;
                return Ok(Type::Object(raw_name));
            }
            Some(b'<') => {}
            _ => return Err(self.error("missing trailing semicolon")),
        }

        let type_arguments = self.parse_type_arguments()?;

        let mut inner = Vec::new();
        while self.eat(b'.') {
            let name = self.parse_identifier(b"<;.")?;
            let type_arguments = if self.peek() == Some(b'<') {
                self.parse_type_arguments()?
            } else {
                Vec::new()
            };
            inner.push(InnerType {
                name,
                type_arguments,
            });
        }
        self.expect(b';', "missing trailing semicolon")?;

        Ok(Type::Parameterized(ParameterizedType {
            raw_name,
            type_arguments,
            inner,
        }))
    }

    fn parse_type_arguments(&mut self) -> Result<Vec<Type>> {
        self.expect(b'<', "expected '<'")?;

        let mut arguments = Vec::new();
        loop {
            let argument = match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    Type::wildcard(WildcardBound::Unbounded, None)
                }
                Some(b'+') => {
                    self.pos += 1;
                    Type::wildcard(WildcardBound::Extends, Some(self.parse_field_type()?))
                }
                Some(b'-') => {
                    self.pos += 1;
                    Type::wildcard(WildcardBound::Super, Some(self.parse_field_type()?))
                }
                _ => self.parse_field_type()?,
            };
            arguments.push(argument);

            if self.eat(b'>') {
                break;
            }
        }

        Ok(arguments)
    }

    fn parse_type_parameters(&mut self) -> Result<Vec<TypeParameter>> {
        self.expect(b'<', "expected '<'")?;

        let mut parameters = Vec::new();
        loop {
            let identifier = self.parse_identifier(b":>")?;
            self.expect(b':', "expected ':' after type parameter name")?;

            let class_bound = match self.peek() {
                Some(b'L' | b'[' | b'T') => Some(Box::new(self.parse_field_type()?)),
                _ => None,
            };

            let mut interface_bounds = Vec::new();
            while self.eat(b':') {
                interface_bounds.push(self.parse_field_type()?);
            }

            parameters.push(TypeParameter {
                identifier,
                class_bound,
                interface_bounds,
            });

            if self.eat(b'>') {
                break;
            }
        }

        Ok(parameters)
    }

    // Terminators are ASCII, so `pos` always lands on a char boundary.
    fn parse_identifier(&mut self, terminators: &[u8]) -> Result<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if terminators.contains(&c) {
                break;
            }
            self.pos += 1;
        }

        if self.pos == start {
            return Err(self.error("expected an identifier"));
        }

        Ok(self.text[start..self.pos].to_owned())
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: u8, reason: &'static str) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }

    fn error(&self, reason: &'static str) -> MalformedDescriptor {
        MalformedDescriptor {
            descriptor: self.text.to_owned(),
            offset: self.pos,
            reason,
        }
    }
}




#[cfg(test)]
mod try_parse_type_tests {
    use super::*;

    #[test]
    fn it_should_return_none_for_free_text() {
        assert_eq!(None, try_parse_type("Hello, world!"));
        assert_eq!(None, try_parse_type("java/lang/String"));
    }

    #[test]
    fn it_should_return_the_type_for_a_descriptor() {
        assert_eq!(Some(Type::INT), try_parse_type("I"));
    }
}
